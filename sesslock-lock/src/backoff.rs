//! Retry budget and backoff for lock acquisition.

use serde::{Deserialize, Serialize};
use sesslock_redis::secs_f64;
use std::time::Duration;

/// Bounded exponential backoff.
///
/// `max_attempts` caps the number of conditional sets; sleeps happen only
/// between attempts, so the worst-case wait is the sum of the first
/// `max_attempts - 1` delays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Maximum number of acquisition attempts.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    #[serde(with = "secs_f64")]
    pub initial: Duration,
    /// Growth factor applied after each sleep.
    pub multiplier: f64,
    /// Upper bound for a single delay.
    #[serde(with = "secs_f64")]
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial: Duration::from_millis(100),
            multiplier: 1.5,
            max: Duration::from_millis(500),
        }
    }
}

impl BackoffPolicy {
    /// Create a policy with the given attempt budget and default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Set the initial delay.
    pub fn with_initial(mut self, initial: Duration) -> Self {
        self.initial = initial;
        self
    }

    /// Set the growth factor.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the delay cap.
    pub fn with_max(mut self, max: Duration) -> Self {
        self.max = max;
        self
    }

    /// Delay for the n-th sleep (0-indexed).
    pub fn delay_for_sleep(&self, sleep: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(sleep as i32);
        let nanos = (self.initial.as_nanos() as f64 * factor).round();
        if nanos >= self.max.as_nanos() as f64 {
            return self.max;
        }
        Duration::from_nanos(nanos as u64)
    }

    /// Longest total time `acquire` can spend sleeping.
    pub fn worst_case_wait(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|n| self.delay_for_sleep(n))
            .sum()
    }
}
