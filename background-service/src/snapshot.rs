use chrono::{DateTime, Duration, NaiveDate, Utc};
use database::{TrendStore, MAX_REPORTED_ERRORS};
use painpoint_core::CoreError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use trend_aggregator::{snapshot_stats, MAX_WINDOW_DAYS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotReport {
    pub snapshot_date: NaiveDate,
    pub written: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Daily keyword snapshot batch. Safe to rerun: each `(keyword, day)` row is
/// overwritten.
pub struct SnapshotJob {
    store: Arc<dyn TrendStore>,
    window_days: i64,
}

impl SnapshotJob {
    pub fn new(store: Arc<dyn TrendStore>, window_days: i64) -> Self {
        Self {
            store,
            window_days: window_days.clamp(1, MAX_WINDOW_DAYS),
        }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<SnapshotReport, CoreError> {
        let posts = self
            .store
            .posts_since(now - Duration::days(self.window_days))
            .await?;
        let snapshots = snapshot_stats(&posts, now, self.window_days);

        let mut report = SnapshotReport {
            snapshot_date: now.date_naive(),
            written: 0,
            failed: 0,
            errors: Vec::new(),
        };

        for snapshot in &snapshots {
            match self.store.upsert_snapshot(snapshot).await {
                Ok(()) => report.written += 1,
                Err(e) => {
                    warn!("Failed to write snapshot for '{}': {}", snapshot.keyword, e);
                    report.failed += 1;
                    if report.errors.len() < MAX_REPORTED_ERRORS {
                        report.errors.push(format!("{}: {}", snapshot.keyword, e));
                    }
                }
            }
        }

        info!(
            "Wrote {} trend snapshots for {} from {} posts",
            report.written,
            report.snapshot_date,
            posts.len()
        );
        Ok(report)
    }
}
