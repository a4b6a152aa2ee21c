//! Keyword trend statistics derived from stored posts.
//!
//! Everything here is pure: callers load the posts and persist the results.

pub mod change;
pub mod snapshot;

pub use change::{calculate_change, period_counts, TrendDirection};
pub use snapshot::snapshot_stats;

use chrono::{DateTime, NaiveDate, Utc};
use painpoint_core::Post;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Keywords kept in the ranked list.
pub const RANKED_KEYWORDS: usize = 10;

/// Keywords broken out in the daily series.
pub const SERIES_KEYWORDS: usize = 3;

pub const DEFAULT_WINDOW_DAYS: i64 = 7;
pub const MAX_WINDOW_DAYS: i64 = 365;

const DAY_LABEL_FORMAT: &str = "%a %b %d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordTrend {
    pub keyword: String,
    pub mentions: i64,
    pub avg_score: f64,
    pub change: i64,
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    /// e.g. `Mon Jan 15`
    pub label: String,
    pub counts: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub ranked_keywords: Vec<KeywordTrend>,
    pub daily_series: Vec<DailyPoint>,
    pub top_keywords: Vec<String>,
    pub window_days: i64,
}

#[derive(Debug, Default)]
pub(crate) struct KeywordStats {
    pub(crate) count: i64,
    pub(crate) total_score: i64,
    pub(crate) by_day: BTreeMap<NaiveDate, i64>,
}

/// Per-keyword stats in first-seen order.
pub(crate) fn accumulate<'a>(
    posts: impl IntoIterator<Item = &'a Post>,
) -> Vec<(String, KeywordStats)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut stats: Vec<(String, KeywordStats)> = Vec::new();

    for post in posts {
        let day = post.source_created_at.date_naive();
        for keyword in &post.keywords {
            let slot = match index.get(keyword) {
                Some(&i) => i,
                None => {
                    index.insert(keyword.clone(), stats.len());
                    stats.push((keyword.clone(), KeywordStats::default()));
                    stats.len() - 1
                }
            };
            let entry = &mut stats[slot].1;
            entry.count += 1;
            entry.total_score += post.score;
            *entry.by_day.entry(day).or_insert(0) += 1;
        }
    }

    stats
}

/// Posts whose source timestamp falls in `[now - window_days, now]`.
pub(crate) fn in_window<'a>(
    posts: &'a [Post],
    now: DateTime<Utc>,
    window_days: i64,
) -> impl Iterator<Item = &'a Post> {
    let end = now.timestamp();
    let start = end.saturating_sub(window_days.max(0).saturating_mul(86_400));
    posts.iter().filter(move |p| {
        let ts = p.source_created_at.timestamp();
        ts >= start && ts <= end
    })
}

pub(crate) fn average(total: i64, count: i64) -> f64 {
    if count > 0 {
        total as f64 / count as f64
    } else {
        0.0
    }
}

pub fn compute_trends(posts: &[Post], now: DateTime<Utc>, window_days: i64) -> TrendReport {
    let window: Vec<&Post> = in_window(posts, now, window_days).collect();

    let mut ranked: Vec<KeywordTrend> = accumulate(window.iter().copied())
        .into_iter()
        .map(|(keyword, stats)| {
            let (recent, older) = period_counts(&stats.by_day);
            let change = calculate_change(recent, older);
            KeywordTrend {
                keyword,
                mentions: stats.count,
                avg_score: average(stats.total_score, stats.count),
                change,
                direction: TrendDirection::from_change(change),
            }
        })
        .collect();

    // Stable: equal mention counts stay in first-seen order.
    ranked.sort_by(|a, b| b.mentions.cmp(&a.mentions));
    ranked.truncate(RANKED_KEYWORDS);

    let top_keywords: Vec<String> = ranked
        .iter()
        .take(SERIES_KEYWORDS)
        .map(|k| k.keyword.clone())
        .collect();

    let days: BTreeSet<NaiveDate> = window
        .iter()
        .map(|p| p.source_created_at.date_naive())
        .collect();

    let daily_series = days
        .into_iter()
        .map(|date| {
            let mut counts: BTreeMap<String, i64> =
                top_keywords.iter().map(|k| (k.clone(), 0)).collect();
            for post in window
                .iter()
                .filter(|p| p.source_created_at.date_naive() == date)
            {
                for keyword in &post.keywords {
                    if let Some(count) = counts.get_mut(keyword) {
                        *count += 1;
                    }
                }
            }
            DailyPoint {
                date,
                label: date.format(DAY_LABEL_FORMAT).to_string(),
                counts,
            }
        })
        .collect();

    debug!(
        "Computed trends over {} posts ({} keywords) for a {}-day window",
        window.len(),
        ranked.len(),
        window_days
    );

    TrendReport {
        ranked_keywords: ranked,
        daily_series,
        top_keywords,
        window_days,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::post;
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_window() {
        let report = compute_trends(&[], now(), 7);
        assert!(report.ranked_keywords.is_empty());
        assert!(report.daily_series.is_empty());
        assert!(report.top_keywords.is_empty());
        assert_eq!(report.window_days, 7);

        let stale = vec![post("old", &["ai"], 5, now() - Duration::days(30))];
        let report = compute_trends(&stale, now(), 7);
        assert!(report.ranked_keywords.is_empty());
        assert!(report.daily_series.is_empty());
    }

    #[test]
    fn test_ranking_and_average() {
        let posts = vec![
            post("1", &["crm"], 10, now() - Duration::hours(2)),
            post("2", &["ai", "crm"], 20, now() - Duration::hours(3)),
            post("3", &["ai"], 30, now() - Duration::days(1)),
            post("4", &["slack"], 1, now() - Duration::days(2)),
            post("5", &["crm"], 0, now() - Duration::days(2)),
        ];

        let report = compute_trends(&posts, now(), 7);
        let names: Vec<&str> = report
            .ranked_keywords
            .iter()
            .map(|k| k.keyword.as_str())
            .collect();
        assert_eq!(names, vec!["crm", "ai", "slack"]);

        let crm = &report.ranked_keywords[0];
        assert_eq!(crm.mentions, 3);
        assert_eq!(crm.avg_score, 10.0);

        let ai = &report.ranked_keywords[1];
        assert_eq!(ai.avg_score, 25.0);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let posts = vec![
            post("1", &["zapier"], 1, now() - Duration::hours(1)),
            post("2", &["api"], 1, now() - Duration::hours(2)),
        ];
        let report = compute_trends(&posts, now(), 7);
        assert_eq!(report.top_keywords, vec!["zapier", "api"]);
    }

    #[test]
    fn test_change_over_active_days() {
        // Older three days: 1 + 1 + 3 = 5, recent three days: 2 + 4 + 4 = 10
        let mut posts = Vec::new();
        for (days_ago, count) in [(6, 1), (5, 1), (4, 3), (2, 2), (1, 4), (0, 4)] {
            for i in 0..count {
                posts.push(post(
                    &format!("{days_ago}-{i}"),
                    &["ai"],
                    1,
                    now() - Duration::days(days_ago) - Duration::minutes(i),
                ));
            }
        }

        let report = compute_trends(&posts, now(), 7);
        let ai = &report.ranked_keywords[0];
        assert_eq!(ai.mentions, 15);
        assert_eq!(ai.change, 100);
        assert_eq!(ai.direction, TrendDirection::Up);
    }

    #[test]
    fn test_daily_series_includes_zero_counts() {
        let monday = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let posts = vec![
            post("1", &["ai", "crm"], 1, monday - Duration::days(1)),
            post("2", &["ai"], 1, monday),
            post("3", &["email"], 1, monday),
            post("4", &["slack"], 1, monday - Duration::days(1)),
            post("5", &["ai"], 1, monday),
        ];

        let report = compute_trends(&posts, now(), 7);
        assert_eq!(report.top_keywords, vec!["ai", "crm", "email"]);
        assert_eq!(report.daily_series.len(), 2);

        let sunday = &report.daily_series[0];
        assert_eq!(sunday.label, "Sun Jan 14");
        assert_eq!(sunday.counts["ai"], 1);
        assert_eq!(sunday.counts["crm"], 1);
        assert_eq!(sunday.counts["email"], 0);
        assert!(!sunday.counts.contains_key("slack"));

        let mon = &report.daily_series[1];
        assert_eq!(mon.label, "Mon Jan 15");
        assert_eq!(mon.counts["ai"], 2);
        assert_eq!(mon.counts["crm"], 0);
    }

    #[test]
    fn test_report_serializes_direction_lowercase() {
        let posts = vec![post("1", &["ai"], 1, now())];
        let json = serde_json::to_value(compute_trends(&posts, now(), 7)).unwrap();
        assert_eq!(json["ranked_keywords"][0]["direction"], "up");
        assert_eq!(json["ranked_keywords"][0]["change"], 100);
    }
}
