use async_trait::async_trait;
use chrono::{DateTime, Utc};
use painpoint_core::{CoreError, DatabaseError, IdeaQuery, IdeasPage, NewPost, Post, Source};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use tracing::debug;
use uuid::Uuid;

use crate::store::PostStore;
use crate::{decode_string_list, timestamp_to_datetime, Database};

const POST_COLUMNS: &str = "id, source, source_id, subreddit, title, body, url, score, \
     comments_count, keywords, pain_score, source_created_at, created_at";

#[derive(Debug, FromRow)]
struct PostRow {
    id: String,
    source: String,
    source_id: String,
    subreddit: Option<String>,
    title: String,
    body: Option<String>,
    url: String,
    score: i64,
    comments_count: i64,
    keywords: String,
    pain_score: i64,
    source_created_at: i64,
    created_at: i64,
}

impl TryFrom<PostRow> for Post {
    type Error = CoreError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let source = row
            .source
            .parse::<Source>()
            .map_err(|_| DatabaseError::CorruptRow {
                table: "posts".to_string(),
                details: format!("unknown source '{}'", row.source),
            })?;

        Ok(Post {
            id: row.id,
            source,
            source_id: row.source_id,
            subreddit: row.subreddit,
            title: row.title,
            body: row.body,
            url: row.url,
            score: row.score,
            comments_count: row.comments_count,
            keywords: decode_string_list("posts", "keywords", &row.keywords)?,
            pain_score: row.pain_score,
            source_created_at: timestamp_to_datetime(
                "posts",
                "source_created_at",
                row.source_created_at,
            )?,
            created_at: timestamp_to_datetime("posts", "created_at", row.created_at)?,
        })
    }
}

fn rows_to_posts(rows: Vec<PostRow>) -> Result<Vec<Post>, CoreError> {
    rows.into_iter().map(Post::try_from).collect()
}

fn push_idea_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &IdeaQuery, now: DateTime<Utc>) {
    if let Some(source) = query.source {
        qb.push(" AND source = ");
        qb.push_bind(source.as_str());
    }
    if let Some(subreddit) = &query.subreddit {
        qb.push(" AND subreddit = ");
        qb.push_bind(subreddit.clone());
        qb.push(" COLLATE NOCASE");
    }
    if let Some(days) = query.days {
        let cutoff = now.timestamp().saturating_sub(days.saturating_mul(86_400));
        qb.push(" AND source_created_at >= ");
        qb.push_bind(cutoff);
    }
    if let Some(min) = query.effective_min_pain_score() {
        qb.push(" AND pain_score >= ");
        qb.push_bind(min);
    }
}

impl Database {
    pub async fn upsert_post(&self, post: &NewPost) -> Result<(), CoreError> {
        let keywords = serde_json::to_string(&post.keywords)?;

        sqlx::query(
            r#"
            INSERT INTO posts (
                id, source, source_id, subreddit, title, body, url, score,
                comments_count, keywords, pain_score, source_created_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source, source_id) DO UPDATE SET
                score = excluded.score,
                comments_count = excluded.comments_count,
                keywords = excluded.keywords,
                pain_score = excluded.pain_score
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(post.source.as_str())
        .bind(&post.source_id)
        .bind(&post.subreddit)
        .bind(&post.title)
        .bind(&post.body)
        .bind(&post.url)
        .bind(post.score)
        .bind(post.comments_count)
        .bind(keywords)
        .bind(post.pain_score)
        .bind(post.source_created_at.timestamp())
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_post(&self, source: Source, source_id: &str) -> Result<Option<Post>, CoreError> {
        let sql = format!(
            "SELECT {} FROM posts WHERE source = ? AND source_id = ?",
            POST_COLUMNS
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(source.as_str())
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Post::try_from).transpose()
    }

    /// One page of ideas, best pain points first. `now` anchors the `days` filter.
    pub async fn query_ideas(
        &self,
        query: &IdeaQuery,
        now: DateTime<Utc>,
    ) -> Result<IdeasPage, CoreError> {
        query.validate()?;

        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts WHERE 1 = 1");
        push_idea_filters(&mut count_qb, query, now);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM posts WHERE 1 = 1",
            POST_COLUMNS
        ));
        push_idea_filters(&mut qb, query, now);
        qb.push(" ORDER BY pain_score DESC, score DESC, source_created_at DESC LIMIT ");
        qb.push_bind(query.limit);
        qb.push(" OFFSET ");
        qb.push_bind(query.offset);

        let rows: Vec<PostRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        let posts = rows_to_posts(rows)?;

        debug!(
            "Ideas query returned {} of {} rows (offset {})",
            posts.len(),
            total,
            query.offset
        );
        Ok(IdeasPage::new(posts, total, query.limit, query.offset))
    }

    pub async fn recent_posts(&self, limit: i64) -> Result<Vec<Post>, CoreError> {
        let sql = format!(
            "SELECT {} FROM posts ORDER BY source_created_at DESC LIMIT ?",
            POST_COLUMNS
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows_to_posts(rows)
    }

    pub async fn count_posts_since(&self, since: DateTime<Utc>) -> Result<i64, CoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE source_created_at >= ?")
                .bind(since.timestamp())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Posts created at the source on or after `since`, oldest first.
    pub async fn posts_since(&self, since: DateTime<Utc>) -> Result<Vec<Post>, CoreError> {
        let sql = format!(
            "SELECT {} FROM posts WHERE source_created_at >= ? ORDER BY source_created_at ASC",
            POST_COLUMNS
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(since.timestamp())
            .fetch_all(&self.pool)
            .await?;
        rows_to_posts(rows)
    }

    pub async fn count_posts(&self) -> Result<i64, CoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl PostStore for Database {
    async fn upsert_post(&self, post: &NewPost) -> Result<(), CoreError> {
        Database::upsert_post(self, post).await
    }
}
