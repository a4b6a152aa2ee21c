use database::{AlertSource, PostStore, UpsertEngine};
use painpoint_core::{Alert, CoreError, ErrorExt, ErrorReporter, NewPost, RawPost, Source};
use serde::{Deserialize, Serialize};
use signal_extractor::analyze;
use source_client::SourceAdapter;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub reddit_saved: usize,
    pub hackernews_saved: usize,
    /// Raw posts returned by all adapters, duplicates included.
    pub fetched: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// First few persistence failures; `failed` has the full count.
    pub errors: Vec<String>,
    /// Posts matched by at least one active alert.
    pub alert_matches: usize,
    pub failed_sources: Vec<Source>,
    /// `CODE: message` for each failed source.
    pub source_errors: Vec<String>,
}

impl SyncReport {
    pub fn saved(&self) -> usize {
        self.reddit_saved + self.hackernews_saved
    }

    pub fn summary(&self) -> String {
        format!(
            "Scanned {} posts, saved {} ideas",
            self.fetched,
            self.saved()
        )
    }
}

/// One fetch, score and persist pass over every source.
pub struct SyncService {
    reddit: Arc<dyn SourceAdapter>,
    hackernews: Arc<dyn SourceAdapter>,
    engine: UpsertEngine,
    alerts: Arc<dyn AlertSource>,
}

impl SyncService {
    pub fn new(
        reddit: Arc<dyn SourceAdapter>,
        hackernews: Arc<dyn SourceAdapter>,
        store: Arc<dyn PostStore>,
        alerts: Arc<dyn AlertSource>,
    ) -> Self {
        Self {
            reddit,
            hackernews,
            engine: UpsertEngine::new(store),
            alerts,
        }
    }

    pub async fn run_sync_pass(&self) -> SyncReport {
        let started = Instant::now();
        info!("Starting sync pass");

        let (reddit, hackernews) = tokio::join!(
            fetch_source(self.reddit.as_ref()),
            fetch_source(self.hackernews.as_ref())
        );

        let mut report = SyncReport::default();
        let mut candidates: Vec<NewPost> = Vec::new();

        for (adapter, outcome) in [(&self.reddit, reddit), (&self.hackernews, hackernews)] {
            match outcome {
                Ok(posts) => {
                    report.fetched += posts.len();
                    candidates.extend(posts.into_iter().map(|raw| {
                        let signals = analyze(&raw);
                        NewPost::from_raw(raw, signals.keywords, signals.pain_score)
                    }));
                }
                Err(e) => {
                    report.failed_sources.push(adapter.source());
                    report
                        .source_errors
                        .push(format!("{}: {}", e.error_code(), e.user_friendly_message()));
                }
            }
        }

        let (unique, duplicates) = UpsertEngine::dedup_and_sort(candidates);
        report.duplicates = duplicates;
        report.alert_matches = self.count_alert_matches(&unique).await;

        let upsert = self.engine.persist(unique).await;
        report.reddit_saved = upsert.saved_for(Source::Reddit);
        report.hackernews_saved = upsert.saved_for(Source::HackerNews);
        report.failed = upsert.failed;
        report.errors = upsert.errors;

        for adapter in [&self.reddit, &self.hackernews] {
            if let Some(metrics) = adapter.metrics() {
                metrics.log_summary().await;
            }
        }

        info!(
            "Sync pass finished in {:?}: {} (reddit {}, hackernews {}, {} failed, {} alert matches)",
            started.elapsed(),
            report.summary(),
            report.reddit_saved,
            report.hackernews_saved,
            report.failed,
            report.alert_matches
        );

        report
    }

    async fn count_alert_matches(&self, posts: &[NewPost]) -> usize {
        let alerts: Vec<Alert> = match self.alerts.active_alerts().await {
            Ok(alerts) => alerts,
            Err(e) => {
                warn!("Could not load alerts, skipping alert matching: {}", e);
                return 0;
            }
        };
        if alerts.is_empty() {
            return 0;
        }

        posts
            .iter()
            .filter(|post| {
                alerts.iter().any(|alert| {
                    alert.matches_fields(
                        post.subreddit.as_deref(),
                        &post.title,
                        post.body.as_deref(),
                    )
                })
            })
            .count()
    }
}

/// A failed source is reported here and skipped by the caller.
async fn fetch_source(adapter: &dyn SourceAdapter) -> Result<Vec<RawPost>, CoreError> {
    let source = adapter.source();
    match adapter.fetch_posts().await {
        Ok(posts) => {
            info!("Fetched {} posts from {}", posts.len(), source);
            Ok(posts)
        }
        Err(e) if e.is_degraded() => {
            warn!("{} is blocking requests, skipping it this pass", source);
            ErrorReporter::new().report_warning(&e);
            Err(e)
        }
        Err(e) => {
            error!("Failed to fetch from {}", source);
            ErrorReporter::new().report_error(&e);
            Err(e)
        }
    }
}
