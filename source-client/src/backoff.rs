use painpoint_core::BackoffConfig;
use std::time::Duration;

/// Exponential backoff applied when a source answers with a rate-limit signal.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay unit multiplied by `2^consecutive_errors` (in milliseconds)
    pub seed_ms: u64,
    /// Upper bound for any single delay (in milliseconds)
    pub cap_ms: u64,
    /// Rate-limited attempts retried before giving up
    pub max_retries: u32,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            seed_ms: 1000,
            cap_ms: 60000,
            max_retries: 5,
            jitter_factor: 0.0,
        }
    }
}

impl From<&BackoffConfig> for BackoffPolicy {
    fn from(config: &BackoffConfig) -> Self {
        Self {
            seed_ms: config.seed_ms,
            cap_ms: config.cap_ms,
            max_retries: config.max_retries,
            jitter_factor: config.jitter_factor,
        }
    }
}

impl BackoffPolicy {
    /// Policy with no delay at all, for tests and local mocks.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            seed_ms: 0,
            cap_ms: 0,
            max_retries,
            jitter_factor: 0.0,
        }
    }

    /// Delay after the `consecutive_errors`-th rate-limit signal in a row.
    pub fn delay_for(&self, consecutive_errors: u32) -> Duration {
        calculate_delay(consecutive_errors, self)
    }
}

/// `min(cap, seed * 2^consecutive_errors)`, plus optional jitter, still capped.
pub fn calculate_delay(consecutive_errors: u32, policy: &BackoffPolicy) -> Duration {
    let multiplier = 2u64.checked_pow(consecutive_errors).unwrap_or(u64::MAX);
    let exponential_ms = policy.seed_ms.saturating_mul(multiplier).min(policy.cap_ms);

    let jitter_range = (exponential_ms as f64 * policy.jitter_factor) as u64;
    let jitter = if jitter_range > 0 {
        fastrand::u64(0..=jitter_range)
    } else {
        0
    };

    Duration::from_millis(exponential_ms.saturating_add(jitter).min(policy.cap_ms))
}
