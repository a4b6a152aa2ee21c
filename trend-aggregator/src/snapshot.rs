use chrono::{DateTime, Utc};
use painpoint_core::{Post, TrendSnapshot};

use crate::{accumulate, average, in_window};

/// One snapshot per keyword mentioned in the trailing `window_days`, dated
/// on the UTC day of `now`. Highest mention count first.
pub fn snapshot_stats(posts: &[Post], now: DateTime<Utc>, window_days: i64) -> Vec<TrendSnapshot> {
    let snapshot_date = now.date_naive();

    let mut snapshots: Vec<TrendSnapshot> = accumulate(in_window(posts, now, window_days))
        .into_iter()
        .map(|(keyword, stats)| TrendSnapshot {
            keyword,
            snapshot_date,
            mention_count: stats.count,
            avg_score: average(stats.total_score, stats.count),
        })
        .collect();

    snapshots.sort_by(|a, b| b.mention_count.cmp(&a.mention_count));
    snapshots
}
