use chrono::{DateTime, Duration, Utc};
use database::Database;
use painpoint_core::{CoreError, DashboardStats, IdeaQuery, IdeasPage};
use std::sync::Arc;
use tracing::debug;
use trend_aggregator::{compute_trends, TrendReport, MAX_WINDOW_DAYS};

const DASHBOARD_WINDOW_DAYS: i64 = 7;
const RECENT_POSTS: i64 = 5;

/// Read side used by the CLI.
#[derive(Clone)]
pub struct QueryService {
    db: Arc<Database>,
    default_window_days: i64,
}

impl QueryService {
    pub fn new(db: Arc<Database>, default_window_days: i64) -> Self {
        Self {
            db,
            default_window_days,
        }
    }

    pub async fn query_ideas(&self, query: &IdeaQuery) -> Result<IdeasPage, CoreError> {
        self.db.query_ideas(query, Utc::now()).await
    }

    pub async fn query_trends(&self, window_days: Option<i64>) -> Result<TrendReport, CoreError> {
        self.query_trends_at(window_days, Utc::now()).await
    }

    pub async fn query_trends_at(
        &self,
        window_days: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<TrendReport, CoreError> {
        let window_days = window_days.unwrap_or(self.default_window_days);
        if !(1..=MAX_WINDOW_DAYS).contains(&window_days) {
            return Err(CoreError::InvalidInput {
                message: format!("days must be between 1 and {}", MAX_WINDOW_DAYS),
            });
        }

        let posts = self
            .db
            .posts_since(now - Duration::days(window_days))
            .await?;
        debug!("Computing trends over {} posts", posts.len());
        Ok(compute_trends(&posts, now, window_days))
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, CoreError> {
        self.dashboard_at(Utc::now()).await
    }

    pub async fn dashboard_at(&self, now: DateTime<Utc>) -> Result<DashboardStats, CoreError> {
        let week_ago = now - Duration::days(DASHBOARD_WINDOW_DAYS);

        let (posts_this_week, active_communities, top_keyword, active_alerts, recent_posts) = tokio::try_join!(
            self.db.count_posts_since(week_ago),
            self.db.count_active_communities(),
            self.db.top_snapshot_keyword_since(week_ago.date_naive()),
            self.db.count_active_alerts(),
            self.db.recent_posts(RECENT_POSTS),
        )?;

        Ok(DashboardStats {
            posts_this_week,
            active_communities,
            top_keyword,
            active_alerts,
            recent_posts,
        })
    }
}
