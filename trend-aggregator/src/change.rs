use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Days on each side of the period-over-period comparison.
pub const PERIOD_DAYS: usize = 3;

/// Change (in percent) above which a keyword is trending up, and below the
/// negation of which it is trending down.
pub const DIRECTION_THRESHOLD: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    pub fn from_change(change: i64) -> Self {
        if change > DIRECTION_THRESHOLD {
            TrendDirection::Up
        } else if change < -DIRECTION_THRESHOLD {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        }
    }
}

/// Percent change from `older` to `recent`, rounded.
///
/// With no older mentions any recent activity counts as +100.
pub fn calculate_change(recent: i64, older: i64) -> i64 {
    if older > 0 {
        ((recent - older) as f64 / older as f64 * 100.0).round() as i64
    } else if recent > 0 {
        100
    } else {
        0
    }
}

/// Sums for the last `PERIOD_DAYS` active days and the `PERIOD_DAYS` before
/// them. Days without mentions are not part of either period.
pub fn period_counts(by_day: &BTreeMap<NaiveDate, i64>) -> (i64, i64) {
    let counts: Vec<i64> = by_day.values().copied().collect();
    let split = counts.len().saturating_sub(PERIOD_DAYS);
    let older_start = split.saturating_sub(PERIOD_DAYS);

    let recent = counts[split..].iter().sum();
    let older = counts[older_start..split].iter().sum();
    (recent, older)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(counts: &[i64]) -> BTreeMap<NaiveDate, i64> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        counts
            .iter()
            .enumerate()
            .map(|(i, c)| (start + chrono::Duration::days(i as i64), *c))
            .collect()
    }

    #[test]
    fn test_change_doubling_is_up() {
        assert_eq!(calculate_change(10, 5), 100);
        assert_eq!(TrendDirection::from_change(100), TrendDirection::Up);
    }

    #[test]
    fn test_change_without_older_period() {
        assert_eq!(calculate_change(5, 0), 100);
        assert_eq!(calculate_change(0, 0), 0);
        assert_eq!(TrendDirection::from_change(0), TrendDirection::Stable);
    }

    #[test]
    fn test_change_decline() {
        assert_eq!(calculate_change(2, 8), -75);
        assert_eq!(TrendDirection::from_change(-75), TrendDirection::Down);
        assert_eq!(TrendDirection::from_change(-5), TrendDirection::Stable);
        assert_eq!(TrendDirection::from_change(5), TrendDirection::Stable);
        assert_eq!(TrendDirection::from_change(6), TrendDirection::Up);
    }

    #[test]
    fn test_period_counts_splits_active_days() {
        assert_eq!(period_counts(&days(&[1, 1, 3, 2, 4, 4])), (10, 5));
        assert_eq!(period_counts(&days(&[9, 1, 1, 3, 2, 4, 4])), (10, 5));
        assert_eq!(period_counts(&days(&[2, 3])), (5, 0));
        assert_eq!(period_counts(&BTreeMap::new()), (0, 0));
    }
}
