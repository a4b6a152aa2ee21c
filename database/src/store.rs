use async_trait::async_trait;
use chrono::{DateTime, Utc};
use painpoint_core::{Alert, CoreError, NewPost, Post, TrendSnapshot};

/// Write side of the post table.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert, or refresh metrics/tags/score of the row with the same
    /// `(source, source_id)`. Identity columns are never touched on conflict.
    async fn upsert_post(&self, post: &NewPost) -> Result<(), CoreError>;
}

#[async_trait]
pub trait AlertSource: Send + Sync {
    async fn active_alerts(&self) -> Result<Vec<Alert>, CoreError>;
}

#[async_trait]
pub trait TrendStore: Send + Sync {
    async fn posts_since(&self, since: DateTime<Utc>) -> Result<Vec<Post>, CoreError>;

    async fn upsert_snapshot(&self, snapshot: &TrendSnapshot) -> Result<(), CoreError>;
}
