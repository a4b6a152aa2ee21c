pub mod backoff;
pub mod hackernews;
pub mod metrics;
pub mod rate_limiter;
pub mod reddit;
mod status;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;


pub use backoff::BackoffPolicy;
pub use hackernews::HackerNewsAdapter;
pub use metrics::{ApiMetrics, MetricsCollector};
pub use rate_limiter::{Clock, ManualClock, RateLimiterRegistry, SourceRateLimiter, TokioClock};
pub use reddit::{RedditAdapter, RedditEndpoints, RedditQuery};

use async_trait::async_trait;
use painpoint_core::{CoreError, RawPost, Source};
use std::sync::Arc;

/// A platform posts are pulled from.
///
/// Implementations must not persist anything; an empty remote result is an
/// empty `Vec`, not an error.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    async fn fetch_posts(&self) -> Result<Vec<RawPost>, CoreError>;

    fn metrics(&self) -> Option<Arc<MetricsCollector>> {
        None
    }
}
