//! Retry policy shared by URL fetches and category page loads
//!
//! One law for every retry site: the n-th retry (0-based) waits
//! `base * multiplier^n`.

use std::time::Duration;

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub base: Duration,

    /// Growth factor applied per retry
    pub multiplier: f64,

    /// Retries allowed after the first attempt
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(base: Duration, multiplier: f64, max_retries: u32) -> Self {
        Self {
            base,
            multiplier,
            max_retries,
        }
    }

    /// Total attempts a request may make: the first one plus every retry
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns true if a request that has already been retried `retries`
    /// times may be retried again
    pub fn should_retry(&self, retries: u32) -> bool {
        retries < self.max_retries
    }

    /// Wait before retry number `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let factor = self.multiplier.powi(exponent);
        let secs = self.base.as_secs_f64() * factor;

        if secs.is_finite() && secs < Duration::MAX.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            Duration::MAX
        }
    }
}
