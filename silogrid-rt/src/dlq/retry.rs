// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use rand::Rng;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Retry schedule for failed message invocations.
///
/// Attempt `n` (1-based retry attempt) is delayed by
/// `min(initial_delay * multiplier^(n-1), max_delay)`; with jitter the
/// delay is scaled by a uniform factor in `[0.5, 1.0]` to decorrelate
/// retry storms. Total invocations = 1 initial + `max_retries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Whether failed invocations are retried at all.
    pub enabled: bool,

    /// Retries after the initial attempt.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Ceiling for the exponential schedule.
    pub max_delay: Duration,

    /// Exponential growth factor.
    pub multiplier: f64,

    /// Whether delays are jittered.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(30_000),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Total invocation budget: the initial attempt plus retries.
    pub fn total_attempts(&self) -> u32 {
        if self.enabled {
            1 + self.max_retries
        } else {
            1
        }
    }

    /// Delay before retry attempt `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63);
        let factor = self.multiplier.max(1.0).powi(exponent as i32);
        let base_ms = self.initial_delay.as_millis() as f64 * factor;
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);

        let final_ms = if self.jitter {
            capped_ms * rand::thread_rng().gen_range(0.5..=1.0)
        } else {
            capped_ms
        };
        Duration::from_millis(final_ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(multiplier: f64, jitter: bool) -> RetryPolicy {
        RetryPolicy {
            enabled: true,
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1_000),
            multiplier,
            jitter,
        }
    }

    #[test]
    fn test_exponential_schedule_without_jitter() {
        let policy = policy(2.0, false);

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(800));
    }

    #[test]
    fn test_schedule_caps_at_max_delay() {
        let policy = policy(2.0, false);

        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for_attempt(20), Duration::from_millis(1_000));
    }

    #[test]
    fn test_flat_schedule_with_unit_multiplier() {
        let policy = policy(1.0, false);

        for attempt in 1..6 {
            assert_eq!(policy.delay_for_attempt(attempt), Duration::from_millis(100));
        }
    }

    #[test]
    fn test_jitter_stays_in_half_to_full_band() {
        let policy = policy(2.0, true);

        for _ in 0..200 {
            let delay = policy.delay_for_attempt(3); // 400ms nominal
            assert!(delay >= Duration::from_millis(200), "{delay:?}");
            assert!(delay <= Duration::from_millis(400), "{delay:?}");
        }
    }

    #[test]
    fn test_total_attempts() {
        assert_eq!(RetryPolicy::default().total_attempts(), 4);
        assert_eq!(RetryPolicy::disabled().total_attempts(), 1);

        let mut policy = RetryPolicy::default();
        policy.max_retries = 0;
        assert_eq!(policy.total_attempts(), 1);
    }
}
