//! Reconnect backoff policy.
//!
//! The math is sync-only and portable; the async loop that sleeps on these
//! delays lives in `lookout-ais`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default base delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 5_000;
/// Default maximum consecutive failures before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Exponential backoff over consecutive failures.
///
/// `delay(n) = base * 2^(n - 1)` for the `n`th consecutive failure
/// (1-based). The counter is owned by the caller and reset after any
/// successful subscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackoffPolicy {
    /// Delay after the first failure, in ms.
    pub base_delay_ms: u64,
    /// Consecutive failures after which the caller stops retrying.
    pub max_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl BackoffPolicy {
    /// Create a policy.
    pub fn new(base_delay: Duration, max_retries: u32) -> Self {
        Self {
            base_delay_ms: u64::try_from(base_delay.as_millis()).unwrap_or(u64::MAX),
            max_retries,
        }
    }

    /// Delay before the next attempt after `retry_count` consecutive failures.
    ///
    /// `retry_count` is 1-based; `0` is treated as `1`. Saturates instead of
    /// overflowing for large counts.
    pub fn delay(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1).min(63);
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    /// Whether `retry_count` consecutive failures exhaust the budget.
    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.base_delay_ms, 5_000);
        assert_eq!(policy.max_retries, 5);
    }

    #[test]
    fn delay_doubles_per_failure() {
        let policy = BackoffPolicy::new(Duration::from_secs(5), 5);
        assert_eq!(policy.delay(1), Duration::from_secs(5));
        assert_eq!(policy.delay(2), Duration::from_secs(10));
        assert_eq!(policy.delay(3), Duration::from_secs(20));
        assert_eq!(policy.delay(4), Duration::from_secs(40));
        for n in 1..10 {
            assert_eq!(policy.delay(n + 1), policy.delay(n) * 2);
        }
    }

    #[test]
    fn zero_count_uses_base_delay() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), 3);
        assert_eq!(policy.delay(0), Duration::from_millis(100));
    }

    #[test]
    fn huge_count_saturates() {
        let policy = BackoffPolicy::new(Duration::from_secs(5), 5);
        assert_eq!(policy.delay(u32::MAX), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn exhaustion_at_max() {
        let policy = BackoffPolicy::new(Duration::from_secs(1), 5);
        assert!(!policy.is_exhausted(4));
        assert!(policy.is_exhausted(5));
        assert!(policy.is_exhausted(6));
    }

    #[test]
    fn serde_camel_case() {
        let json = serde_json::to_value(BackoffPolicy::default()).unwrap();
        assert_eq!(json["baseDelayMs"], 5_000);
        assert_eq!(json["maxRetries"], 5);
    }
}
