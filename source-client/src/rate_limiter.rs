use crate::backoff::BackoffPolicy;
use async_trait::async_trait;
use painpoint_core::{CoreError, Source, SourceApiError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Time source for the limiter.
#[async_trait]
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that only moves when slept on. Records every sleep it was asked for.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    elapsed: std::sync::Mutex<Duration>,
    sleeps: std::sync::Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: std::sync::Mutex::new(Duration::ZERO),
            sleeps: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed += duration;
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.lock().map(|e| *e).unwrap_or_default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub source: Source,
    pub min_interval: Duration,
    pub consecutive_errors: u32,
    pub total_requests: u64,
}

#[derive(Debug, Default)]
struct LimiterState {
    last_request: Option<Instant>,
    consecutive_errors: u32,
    total_requests: u64,
}

/// Spaces request starts for one source and backs off on rate-limit signals.
///
/// The state lock is held for the whole wait+request cycle, so concurrent
/// callers for the same source run one after another.
#[derive(Debug)]
pub struct SourceRateLimiter {
    source: Source,
    min_interval: Duration,
    policy: BackoffPolicy,
    clock: Arc<dyn Clock>,
    state: Mutex<LimiterState>,
}

impl SourceRateLimiter {
    pub fn new(source: Source, min_interval: Duration, policy: BackoffPolicy) -> Self {
        Self::with_clock(source, min_interval, policy, Arc::new(TokioClock))
    }

    pub fn with_clock(
        source: Source,
        min_interval: Duration,
        policy: BackoffPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            min_interval,
            policy,
            clock,
            state: Mutex::new(LimiterState::default()),
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Run `operation` once the interval allows, retrying it on rate limits.
    ///
    /// Errors other than `RateLimitExceeded` are returned untouched on the
    /// first occurrence.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut state = self.state.lock().await;
        let mut retries = 0u32;

        loop {
            if let Some(last) = state.last_request {
                let since_last = self.clock.now().saturating_duration_since(last);
                if since_last < self.min_interval {
                    let wait = self.min_interval - since_last;
                    debug!(source = %self.source, ?wait, "Waiting for request slot");
                    self.clock.sleep(wait).await;
                }
            }

            state.last_request = Some(self.clock.now());
            state.total_requests += 1;

            match operation().await {
                Ok(value) => {
                    state.consecutive_errors = 0;
                    return Ok(value);
                }
                Err(error) if error.is_rate_limited() => {
                    state.consecutive_errors += 1;

                    if retries >= self.policy.max_retries {
                        warn!(
                            source = %self.source,
                            attempts = retries + 1,
                            "Giving up after repeated rate limiting"
                        );
                        return Err(SourceApiError::RetriesExhausted {
                            source_name: self.source,
                            attempts: retries + 1,
                        }
                        .into());
                    }

                    retries += 1;
                    let delay = self.policy.delay_for(state.consecutive_errors);
                    warn!(
                        source = %self.source,
                        consecutive_errors = state.consecutive_errors,
                        ?delay,
                        "Rate limited, backing off"
                    );
                    self.clock.sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    pub async fn status(&self) -> RateLimitStatus {
        let state = self.state.lock().await;
        RateLimitStatus {
            source: self.source,
            min_interval: self.min_interval,
            consecutive_errors: state.consecutive_errors,
            total_requests: state.total_requests,
        }
    }
}

/// One independent limiter per source.
#[derive(Debug, Default)]
pub struct RateLimiterRegistry {
    limiters: HashMap<Source, Arc<SourceRateLimiter>>,
}

impl RateLimiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, limiter: SourceRateLimiter) -> Arc<SourceRateLimiter> {
        let limiter = Arc::new(limiter);
        self.limiters.insert(limiter.source(), limiter.clone());
        limiter
    }

    pub fn get(&self, source: Source) -> Option<Arc<SourceRateLimiter>> {
        self.limiters.get(&source).cloned()
    }

    /// Limiter for `source`, creating one with `min_interval` if missing.
    pub fn get_or_create(
        &mut self,
        source: Source,
        min_interval: Duration,
        policy: &BackoffPolicy,
        clock: Arc<dyn Clock>,
    ) -> Arc<SourceRateLimiter> {
        self.limiters
            .entry(source)
            .or_insert_with(|| {
                Arc::new(SourceRateLimiter::with_clock(
                    source,
                    min_interval,
                    policy.clone(),
                    clock,
                ))
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn limiter(clock: Arc<ManualClock>, interval_ms: u64) -> SourceRateLimiter {
        SourceRateLimiter::with_clock(
            Source::Reddit,
            Duration::from_millis(interval_ms),
            BackoffPolicy::default(),
            clock,
        )
    }

    fn rate_limited() -> CoreError {
        SourceApiError::RateLimitExceeded { retry_after: 60 }.into()
    }

    #[tokio::test]
    async fn test_first_request_does_not_wait() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter(clock.clone(), 6000);

        let value = limiter.execute(|| async { Ok::<_, CoreError>(1) }).await;
        assert_eq!(value.unwrap(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_consecutive_requests_are_spaced() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter(clock.clone(), 6000);
        let mut starts = Vec::new();

        for _ in 0..3 {
            let now = limiter
                .execute(|| {
                    let now = clock.now();
                    async move { Ok::<_, CoreError>(now) }
                })
                .await
                .unwrap();
            starts.push(now);
        }

        for pair in starts.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(6000));
        }
    }

    #[tokio::test]
    async fn test_partial_wait_when_time_already_passed() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter(clock.clone(), 6000);

        limiter.execute(|| async { Ok::<_, CoreError>(()) }).await.unwrap();
        clock.advance(Duration::from_millis(4000));
        limiter.execute(|| async { Ok::<_, CoreError>(()) }).await.unwrap();

        assert_eq!(clock.sleeps(), vec![Duration::from_millis(2000)]);
    }

    #[tokio::test]
    async fn test_concurrent_same_source_calls_are_serialized() {
        let clock = Arc::new(ManualClock::new());
        let limiter = Arc::new(limiter(clock.clone(), 6000));

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                let clock = clock.clone();
                tokio::spawn(async move {
                    limiter
                        .execute(|| {
                            let now = clock.now();
                            async move { Ok::<_, CoreError>(now) }
                        })
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut starts = Vec::new();
        for task in tasks {
            starts.push(task.await.unwrap());
        }
        starts.sort();

        for pair in starts.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(6000));
        }
    }

    #[tokio::test]
    async fn test_sources_are_independent() {
        let reddit_clock = Arc::new(ManualClock::new());
        let hn_clock = Arc::new(ManualClock::new());
        let mut registry = RateLimiterRegistry::new();

        let reddit = registry.get_or_create(
            Source::Reddit,
            Duration::from_millis(6000),
            &BackoffPolicy::default(),
            reddit_clock.clone(),
        );
        let hackernews = registry.get_or_create(
            Source::HackerNews,
            Duration::from_millis(6000),
            &BackoffPolicy::default(),
            hn_clock.clone(),
        );

        reddit.execute(|| async { Ok::<_, CoreError>(()) }).await.unwrap();
        hackernews.execute(|| async { Ok::<_, CoreError>(()) }).await.unwrap();

        assert!(reddit_clock.sleeps().is_empty());
        assert!(hn_clock.sleeps().is_empty());
        assert!(Arc::ptr_eq(
            &reddit,
            &registry.get(Source::Reddit).unwrap()
        ));
    }

    #[tokio::test]
    async fn test_backoff_on_rate_limit_then_success() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter(clock.clone(), 0);
        let calls = AtomicU32::new(0);

        let result = limiter
            .execute(|| {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(rate_limited())
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(2000), Duration::from_millis(4000)]
        );
        assert_eq!(limiter.status().await.consecutive_errors, 0);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let clock = Arc::new(ManualClock::new());
        let policy = BackoffPolicy {
            max_retries: 2,
            ..Default::default()
        };
        let limiter = SourceRateLimiter::with_clock(
            Source::HackerNews,
            Duration::ZERO,
            policy,
            clock.clone(),
        );

        let error = limiter
            .execute(|| async { Err::<(), _>(rate_limited()) })
            .await
            .unwrap_err();

        assert!(error.is_transport());
        match error {
            CoreError::SourceApi(SourceApiError::RetriesExhausted {
                source_name,
                attempts,
            }) => {
                assert_eq!(source_name, Source::HackerNews);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(2000), Duration::from_millis(4000)]
        );
    }

    #[tokio::test]
    async fn test_other_errors_propagate_without_retry() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter(clock.clone(), 0);
        let calls = AtomicU32::new(0);

        let result = limiter
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<(), _>(CoreError::SourceApi(SourceApiError::ServerError {
                        status_code: 503,
                    }))
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(CoreError::SourceApi(SourceApiError::ServerError { .. }))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(clock.sleeps().is_empty());
        assert_eq!(limiter.status().await.consecutive_errors, 0);
    }

    #[tokio::test]
    async fn test_counter_persists_until_success() {
        let clock = Arc::new(ManualClock::new());
        let policy = BackoffPolicy {
            max_retries: 0,
            ..Default::default()
        };
        let limiter =
            SourceRateLimiter::with_clock(Source::Reddit, Duration::ZERO, policy, clock.clone());

        let _ = limiter.execute(|| async { Err::<(), _>(rate_limited()) }).await;
        let _ = limiter.execute(|| async { Err::<(), _>(rate_limited()) }).await;
        assert_eq!(limiter.status().await.consecutive_errors, 2);

        limiter.execute(|| async { Ok::<_, CoreError>(()) }).await.unwrap();
        assert_eq!(limiter.status().await.consecutive_errors, 0);
    }
}
