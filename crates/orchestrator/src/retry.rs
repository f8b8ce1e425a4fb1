//! Exponential backoff schedule for transient failures.

use std::time::Duration;

/// How many automatic re-attempts a turn gets and how long to wait between
/// them. The delay before re-attempt `n` (0-based) is `base_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Whether another attempt is allowed after `attempt` retries already ran.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Delay before re-attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_is_one_then_two_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert!(policy.allows(1));
        assert!(!policy.allows(2));
    }

    #[test]
    fn no_retry_policy() {
        assert!(!RetryPolicy::none().allows(0));
    }

    #[test]
    fn huge_attempt_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_millis(500));
        assert_eq!(policy.delay_for(64), policy.delay_for(40));
        assert!(policy.delay_for(64) > policy.delay_for(31));
    }
}
