#[cfg(test)]
mod tests {
    use crate::{Database, PostStore, UpsertEngine, MAX_REPORTED_ERRORS};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use painpoint_core::{
        Alert, CoreError, IdeaQuery, NewPost, Source, TrendSnapshot, PAIN_THRESHOLD,
    };
    use std::env;
    use std::sync::Arc;
    use tokio;

    async fn setup_test_db() -> Database {
        let db_path = env::temp_dir().join(format!("test_painpoint_{}.db", uuid::Uuid::new_v4()));
        let db_url = format!("sqlite://{}", db_path.display());

        let db = Database::connect(&db_url)
            .await
            .expect("Failed to connect to test database");
        db.run_migrations().await.expect("Failed to run migrations");

        db
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn new_post(source: Source, id: &str, score: i64, pain_score: i64) -> NewPost {
        NewPost {
            source,
            source_id: id.to_string(),
            subreddit: match source {
                Source::Reddit => Some("SaaS".to_string()),
                _ => None,
            },
            title: format!("Looking for a tool #{id}"),
            body: Some("Is there an alternative?".to_string()),
            url: format!("https://reddit.com/r/SaaS/comments/{id}"),
            score,
            comments_count: 3,
            keywords: vec!["saas".to_string()],
            pain_score,
            source_created_at: now() - Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_database_connection_and_migrations() {
        let db = setup_test_db().await;
        assert_eq!(db.count_posts().await.unwrap(), 0);

        // Migrations are re-runnable
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn test_repeated_upsert_is_idempotent() {
        let db = setup_test_db().await;
        let post = new_post(Source::Reddit, "abc", 10, 4);

        db.upsert_post(&post).await.unwrap();
        let first = db.get_post(Source::Reddit, "abc").await.unwrap().unwrap();

        db.upsert_post(&post).await.unwrap();
        let second = db.get_post(Source::Reddit, "abc").await.unwrap().unwrap();

        assert_eq!(db.count_posts().await.unwrap(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_upsert_updates_metrics_not_identity() {
        let db = setup_test_db().await;
        let mut post = new_post(Source::Reddit, "abc", 10, 4);
        db.upsert_post(&post).await.unwrap();
        let before = db.get_post(Source::Reddit, "abc").await.unwrap().unwrap();

        post.score = 20;
        post.comments_count = 9;
        post.pain_score = 7;
        post.keywords = vec!["crm".to_string(), "saas".to_string()];
        post.title = "Edited title".to_string();
        post.source_created_at = now();
        db.upsert_post(&post).await.unwrap();

        let after = db.get_post(Source::Reddit, "abc").await.unwrap().unwrap();
        assert_eq!(db.count_posts().await.unwrap(), 1);
        assert_eq!(after.score, 20);
        assert_eq!(after.comments_count, 9);
        assert_eq!(after.pain_score, 7);
        assert_eq!(after.keywords, vec!["crm", "saas"]);

        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.source_created_at, before.source_created_at);
        assert_eq!(after.title, before.title);
    }

    #[tokio::test]
    async fn test_same_source_id_on_different_sources_are_distinct() {
        let db = setup_test_db().await;
        db.upsert_post(&new_post(Source::Reddit, "1", 1, 0))
            .await
            .unwrap();
        db.upsert_post(&new_post(Source::HackerNews, "1", 1, 0))
            .await
            .unwrap();

        assert_eq!(db.count_posts().await.unwrap(), 2);
        let hn = db.get_post(Source::HackerNews, "1").await.unwrap().unwrap();
        assert_eq!(hn.subreddit, None);
    }

    #[tokio::test]
    async fn test_pain_only_query_ordering() {
        let db = setup_test_db().await;
        for (id, score, pain) in [("a", 100, 2), ("b", 5, 8), ("c", 50, 8), ("d", 10, 3)] {
            db.upsert_post(&new_post(Source::Reddit, id, score, pain))
                .await
                .unwrap();
        }

        let query = IdeaQuery {
            pain_only: true,
            ..Default::default()
        };
        let page = db.query_ideas(&query, now()).await.unwrap();

        let ids: Vec<&str> = page.posts.iter().map(|p| p.source_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "d"]);
        assert!(page.posts.iter().all(|p| p.pain_score >= PAIN_THRESHOLD));
        assert_eq!(page.total, 3);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_query_pagination_and_filters() {
        let db = setup_test_db().await;
        for i in 0..5 {
            db.upsert_post(&new_post(Source::Reddit, &format!("r{i}"), i, 1))
                .await
                .unwrap();
        }
        let mut old = new_post(Source::HackerNews, "old", 500, 9);
        old.source_created_at = now() - Duration::days(30);
        db.upsert_post(&old).await.unwrap();

        let first = db
            .query_ideas(
                &IdeaQuery {
                    limit: 2,
                    ..Default::default()
                },
                now(),
            )
            .await
            .unwrap();
        assert_eq!(first.total, 6);
        assert_eq!(first.posts.len(), 2);
        assert!(first.has_more);
        assert_eq!(first.posts[0].source_id, "old");

        let recent = db
            .query_ideas(
                &IdeaQuery {
                    days: Some(7),
                    ..Default::default()
                },
                now(),
            )
            .await
            .unwrap();
        assert_eq!(recent.total, 5);
        assert!(recent.posts.iter().all(|p| p.source == Source::Reddit));

        let hn = db
            .query_ideas(
                &IdeaQuery {
                    source: Some(Source::HackerNews),
                    ..Default::default()
                },
                now(),
            )
            .await
            .unwrap();
        assert_eq!(hn.total, 1);

        let by_sub = db
            .query_ideas(
                &IdeaQuery {
                    subreddit: Some("saas".to_string()),
                    ..Default::default()
                },
                now(),
            )
            .await
            .unwrap();
        assert_eq!(by_sub.total, 5);
    }

    #[tokio::test]
    async fn test_query_rejects_invalid_limit() {
        let db = setup_test_db().await;
        let result = db
            .query_ideas(
                &IdeaQuery {
                    limit: 0,
                    ..Default::default()
                },
                now(),
            )
            .await;
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_snapshot_upsert_overwrites() {
        let db = setup_test_db().await;
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        db.upsert_snapshot(&TrendSnapshot {
            keyword: "ai".to_string(),
            snapshot_date: date,
            mention_count: 3,
            avg_score: 10.0,
        })
        .await
        .unwrap();
        db.upsert_snapshot(&TrendSnapshot {
            keyword: "ai".to_string(),
            snapshot_date: date,
            mention_count: 7,
            avg_score: 12.5,
        })
        .await
        .unwrap();

        let snapshots = db.snapshots_for_date(date).await.unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].mention_count, 7);
        assert_eq!(snapshots[0].avg_score, 12.5);
    }

    #[tokio::test]
    async fn test_top_snapshot_keyword() {
        let db = setup_test_db().await;
        let today = now().date_naive();
        assert_eq!(db.top_snapshot_keyword_since(today).await.unwrap(), None);

        for (keyword, date, count) in [
            ("crm", today, 4),
            ("ai", today, 9),
            ("slack", today - Duration::days(30), 50),
        ] {
            db.upsert_snapshot(&TrendSnapshot {
                keyword: keyword.to_string(),
                snapshot_date: date,
                mention_count: count,
                avg_score: 1.0,
            })
            .await
            .unwrap();
        }

        let top = db
            .top_snapshot_keyword_since(today - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(top.as_deref(), Some("ai"));
    }

    #[tokio::test]
    async fn test_alerts_and_counts() {
        let db = setup_test_db().await;
        let alert = |id: &str, active: bool| Alert {
            id: id.to_string(),
            user_id: "u1".to_string(),
            name: format!("alert {id}"),
            keywords: vec!["crm".to_string()],
            subreddits: vec!["SaaS".to_string()],
            is_active: active,
            created_at: now(),
        };
        db.insert_alert(&alert("a1", true)).await.unwrap();
        db.insert_alert(&alert("a2", false)).await.unwrap();

        sqlx::query(
            "INSERT INTO communities (id, platform, name, url, subscribers, is_active, created_at) \
             VALUES ('c1', 'reddit', 'SaaS', 'https://reddit.com/r/SaaS', 100, 1, 0), \
                    ('c2', 'reddit', 'webdev', 'https://reddit.com/r/webdev', 100, 0, 0)",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let active = db.active_alerts().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].keywords, vec!["crm"]);
        assert_eq!(db.count_active_alerts().await.unwrap(), 1);
        assert_eq!(db.count_active_communities().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_recent_posts_and_counts_since() {
        let db = setup_test_db().await;
        for (id, hours_ago) in [("a", 1), ("b", 200), ("c", 5)] {
            let mut post = new_post(Source::Reddit, id, 1, 0);
            post.source_created_at = now() - Duration::hours(hours_ago);
            db.upsert_post(&post).await.unwrap();
        }

        let recent = db.recent_posts(2).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|p| p.source_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        let week = db.count_posts_since(now() - Duration::days(7)).await.unwrap();
        assert_eq!(week, 2);

        let since = db.posts_since(now() - Duration::days(7)).await.unwrap();
        assert_eq!(since.len(), 2);
        assert_eq!(since[0].source_id, "c");
    }

    #[tokio::test]
    async fn test_engine_persists_batch_against_sqlite() {
        let db = Arc::new(setup_test_db().await);
        let engine = UpsertEngine::new(db.clone());

        let batch = vec![
            new_post(Source::Reddit, "x", 1, 0),
            new_post(Source::HackerNews, "y", 2, 0),
            new_post(Source::Reddit, "x", 3, 0),
        ];
        let report = engine.persist(batch.clone()).await;
        assert_eq!(report.saved, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.saved_for(Source::Reddit), 1);
        assert_eq!(report.saved_for(Source::HackerNews), 1);

        // First occurrence wins inside the batch
        let x = db.get_post(Source::Reddit, "x").await.unwrap().unwrap();
        assert_eq!(x.score, 1);

        let rerun = engine.persist(batch).await;
        assert_eq!(rerun.saved, 2);
        assert_eq!(db.count_posts().await.unwrap(), 2);
    }

    struct FailingStore {
        fail_prefix: &'static str,
    }

    #[async_trait]
    impl PostStore for FailingStore {
        async fn upsert_post(&self, post: &NewPost) -> Result<(), CoreError> {
            if post.source_id.starts_with(self.fail_prefix) {
                Err(CoreError::Internal {
                    message: "disk full".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_engine_continues_past_failures_and_caps_errors() {
        let engine = UpsertEngine::new(Arc::new(FailingStore { fail_prefix: "bad" }));

        let mut batch: Vec<NewPost> = (0..8)
            .map(|i| new_post(Source::Reddit, &format!("bad{i}"), 1, 0))
            .collect();
        batch.push(new_post(Source::Reddit, "good1", 1, 0));
        batch.push(new_post(Source::HackerNews, "good2", 1, 0));

        let report = engine.persist(batch).await;
        assert_eq!(report.saved, 2);
        assert_eq!(report.failed, 8);
        assert_eq!(report.errors.len(), MAX_REPORTED_ERRORS);
        assert!(report.errors[0].contains("disk full"));
    }
}
