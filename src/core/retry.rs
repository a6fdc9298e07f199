//! Retry policy for optimistic concurrency conflicts
//!
//! Only version conflicts are retried. The policy bounds the number of
//! attempts and optionally spaces them with jittered exponential backoff.

use rand::Rng;
use std::time::Duration;
use tracing::warn;

/// Default number of attempts per operation
pub const MAX_RETRIES: u32 = 3;

/// Configuration for conflict retries
///
/// `max_attempts` counts every attempt, including the first one, and is
/// never zero. A zero `base_backoff` means conflicting attempts are retried
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts before giving up with `TooManyConflicts`
    max_attempts: u32,
    /// Base delay for exponential backoff
    base_backoff: Duration,
    /// Upper bound for any single delay
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Create a RetryPolicy with custom values
    ///
    /// A zero attempt count falls back to the default.
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        let default = Self::default();

        let max_attempts = if max_attempts == 0 {
            warn!(
                max_attempts,
                default = default.max_attempts,
                "invalid max_attempts, using default"
            );
            default.max_attempts
        } else {
            max_attempts
        };

        Self {
            max_attempts,
            base_backoff,
            max_backoff: default.max_backoff.max(base_backoff),
        }
    }

    /// Policy that retries immediately
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_backoff(&self) -> Duration {
        self.base_backoff
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Set the upper bound for a single delay
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Delay to wait after the given failed attempt (1-based)
    ///
    /// Returns `None` for immediate retries. Otherwise the delay is drawn
    /// uniformly from `[0, min(base * 2^(attempt-1), max_backoff)]`.
    pub fn backoff(&self, attempt: u32) -> Option<Duration> {
        if self.base_backoff.is_zero() {
            return None;
        }

        let ceiling = self.ceiling(attempt);
        let ceiling = u64::try_from(ceiling.as_micros()).unwrap_or(u64::MAX);
        let jittered = rand::thread_rng().gen_range(0..=ceiling);
        Some(Duration::from_micros(jittered))
    }

    fn ceiling(&self, attempt: u32) -> Duration {
        // Cap the shift to keep the multiplier in range
        let shift = attempt.saturating_sub(1).min(31);
        self.base_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}
