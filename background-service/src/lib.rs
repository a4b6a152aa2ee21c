pub mod pipeline;
pub mod queries;
pub mod snapshot;
pub mod sync;


pub use pipeline::Pipeline;
pub use queries::QueryService;
pub use snapshot::{SnapshotJob, SnapshotReport};
pub use sync::{SyncReport, SyncService};

use chrono::{DateTime, NaiveDate, Utc};
use painpoint_core::ErrorExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopped| *stopped).await;
}

/// Runs a sync pass every polling interval and the snapshot batch once per
/// UTC day until stopped.
pub struct BackgroundService {
    sync: Arc<SyncService>,
    snapshots: Arc<SnapshotJob>,
    polling_interval: Duration,
    shutdown: watch::Sender<bool>,
    last_snapshot: Mutex<Option<NaiveDate>>,
}

impl BackgroundService {
    pub fn new(
        sync: Arc<SyncService>,
        snapshots: Arc<SnapshotJob>,
        polling_interval_minutes: u64,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            sync,
            snapshots,
            polling_interval: Duration::from_secs(polling_interval_minutes.max(1) * 60),
            shutdown,
            last_snapshot: Mutex::new(None),
        }
    }

    /// Poll until `stop` is called. The first cycle runs immediately; a cycle
    /// in flight when `stop` arrives is dropped.
    pub async fn start(&self) {
        let mut shutdown = self.shutdown.subscribe();
        let mut ticker = tokio::time::interval(self.polling_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Background service started, syncing every {:?}",
            self.polling_interval
        );

        loop {
            tokio::select! {
                _ = stop_requested(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }

            // Stop preempts a cycle parked in rate-limit spacing.
            tokio::select! {
                _ = stop_requested(&mut shutdown) => {
                    info!("Stop requested during a sync cycle, abandoning it");
                    break;
                }
                _ = self.run_cycle(Utc::now()) => {}
            }
        }

        info!("Background service stopped");
    }

    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// One sync pass, then the snapshot batch if it has not run for `now`'s day.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> (SyncReport, Option<SnapshotReport>) {
        let report = self.sync.run_sync_pass().await;

        let today = now.date_naive();
        let mut last = self.last_snapshot.lock().await;
        if *last == Some(today) {
            debug!("Snapshot for {} already taken", today);
            return (report, None);
        }

        match self.snapshots.run(now).await {
            Ok(snapshot) => {
                *last = Some(today);
                (report, Some(snapshot))
            }
            Err(e) => {
                e.log_error();
                (report, None)
            }
        }
    }
}
