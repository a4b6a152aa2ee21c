use painpoint_core::{ErrorExt, NewPost, Source};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::store::PostStore;

/// Failure messages kept per batch; the total is always reported.
pub const MAX_REPORTED_ERRORS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertReport {
    pub saved: usize,
    pub saved_by_source: BTreeMap<Source, usize>,
    pub failed: usize,
    pub errors: Vec<String>,
    /// Candidates dropped because an earlier one had the same key.
    pub duplicates: usize,
}

impl UpsertReport {
    pub fn saved_for(&self, source: Source) -> usize {
        self.saved_by_source.get(&source).copied().unwrap_or(0)
    }
}

/// Deduplicates a batch of scored candidates and writes them one by one.
pub struct UpsertEngine {
    store: Arc<dyn PostStore>,
}

impl UpsertEngine {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }

    /// Keep the first candidate per `(source, source_id)`, then order by
    /// engagement score, highest first. Equal scores keep arrival order.
    pub fn dedup_and_sort(candidates: Vec<NewPost>) -> (Vec<NewPost>, usize) {
        let total = candidates.len();
        let mut seen: HashSet<(Source, String)> = HashSet::with_capacity(total);
        let mut unique: Vec<NewPost> = candidates
            .into_iter()
            .filter(|post| seen.insert((post.source, post.source_id.clone())))
            .collect();

        unique.sort_by(|a, b| b.score.cmp(&a.score));
        let duplicates = total - unique.len();
        (unique, duplicates)
    }

    pub async fn persist(&self, candidates: Vec<NewPost>) -> UpsertReport {
        let (unique, duplicates) = Self::dedup_and_sort(candidates);
        let mut report = UpsertReport {
            duplicates,
            ..Default::default()
        };

        for post in &unique {
            match self.store.upsert_post(post).await {
                Ok(()) => {
                    report.saved += 1;
                    *report.saved_by_source.entry(post.source).or_insert(0) += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    warn!("Failed to upsert {}:{}", post.source, post.source_id);
                    e.log_warn();
                    if report.errors.len() < MAX_REPORTED_ERRORS {
                        report
                            .errors
                            .push(format!("{}:{}: {}", post.source, post.source_id, e));
                    }
                }
            }
        }

        if report.failed > 0 {
            warn!(
                "Upsert finished with {} failures ({} saved)",
                report.failed, report.saved
            );
        } else {
            info!(
                "Upserted {} posts ({} duplicates dropped)",
                report.saved, report.duplicates
            );
        }

        report
    }
}
