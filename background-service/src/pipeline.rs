use database::Database;
use painpoint_core::{AppConfig, CoreError, Source};
use source_client::{
    BackoffPolicy, HackerNewsAdapter, RateLimiterRegistry, RedditAdapter, TokioClock,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::queries::QueryService;
use crate::snapshot::SnapshotJob;
use crate::sync::SyncService;

/// Everything the binary needs, wired from one configuration.
pub struct Pipeline {
    pub db: Arc<Database>,
    pub sync: Arc<SyncService>,
    pub snapshots: Arc<SnapshotJob>,
    pub queries: QueryService,
}

impl Pipeline {
    pub async fn build(config: &AppConfig) -> Result<Self, CoreError> {
        let db = Arc::new(Database::connect(&config.database_url).await?);
        db.run_migrations().await?;

        let policy = BackoffPolicy::from(&config.backoff);
        let clock = Arc::new(TokioClock);
        let mut limiters = RateLimiterRegistry::new();

        let reddit_limiter = limiters.get_or_create(
            Source::Reddit,
            Duration::from_millis(config.reddit.min_interval_ms),
            &policy,
            clock.clone(),
        );
        let hackernews_limiter = limiters.get_or_create(
            Source::HackerNews,
            Duration::from_millis(config.hackernews.min_interval_ms),
            &policy,
            clock,
        );

        let reddit = Arc::new(RedditAdapter::new(config.reddit.clone(), reddit_limiter)?);
        let hackernews = Arc::new(HackerNewsAdapter::new(
            config.hackernews.clone(),
            hackernews_limiter,
        )?);

        let sync = Arc::new(SyncService::new(
            reddit,
            hackernews,
            db.clone(),
            db.clone(),
        ));
        let snapshots = Arc::new(SnapshotJob::new(
            db.clone(),
            config.trends.snapshot_window_days,
        ));
        let queries = QueryService::new(db.clone(), config.trends.default_window_days);

        info!(
            "Pipeline ready: {} subreddits, {} search phrases, {:?} reddit auth",
            config.reddit.subreddits.len(),
            config.reddit.search_phrases.len(),
            config.reddit.auth
        );

        Ok(Self {
            db,
            sync,
            snapshots,
            queries,
        })
    }
}
