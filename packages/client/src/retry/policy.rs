//! Retry policy configuration with exponential backoff and optional jitter
//!
//! Provides retry timing and the classification that decides whether a failed
//! attempt may be retried at all.

use std::time::Duration;

use fastrand::Rng;
use serde::Deserialize;

use crate::error::Error;

/// Retry policy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    #[serde(deserialize_with = "crate::config::serde_ext::duration_ms")]
    pub base_delay: Duration,
    /// Upper bound for any single backoff delay
    #[serde(deserialize_with = "crate::config::serde_ext::duration_ms")]
    pub max_delay: Duration,
    /// Backoff multiplier (2.0 doubles the delay every attempt)
    pub backoff_multiplier: f64,
    /// Jitter factor (0.0 to 1.0); zero keeps delays deterministic
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    /// Three attempts, one second base delay, doubling.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

/// What the executor should do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then try again
    RetryAfter(Duration),
    /// Surface the error now
    Abort,
}

impl RetryPolicy {
    /// Create aggressive retry policy for critical operations
    #[inline]
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }

    /// Create conservative retry policy for non-critical operations
    #[inline]
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(2000),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.05,
        }
    }

    /// Single attempt only
    #[inline]
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before the retry that follows attempt `attempt_index` (zero based):
    /// `base_delay * multiplier^attempt_index`, capped at `max_delay`, with jitter.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn calculate_delay(&self, attempt_index: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;
        let exponent = i32::try_from(attempt_index).unwrap_or(i32::MAX);
        let capped = (base_ms * self.backoff_multiplier.powi(exponent)).min(max_ms);

        if self.jitter_factor <= 0.0 {
            return Duration::from_millis(capped as u64);
        }

        // Symmetric jitter around the capped delay
        let jitter_range = capped * self.jitter_factor;
        let mut rng = Rng::new();
        let jitter = rng.f64() * jitter_range - (jitter_range / 2.0);

        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }

    /// Decide what follows a failed attempt.
    ///
    /// Client errors abort. Rate limiting waits for `Retry-After` when the
    /// server sent one. Server and network errors back off exponentially.
    /// Nothing is retried once `attempt_index + 1` reaches `max_attempts`.
    #[must_use]
    pub fn decide(&self, error: &Error, attempt_index: u32) -> RetryDecision {
        if attempt_index.saturating_add(1) >= self.max_attempts || !error.is_retryable() {
            return RetryDecision::Abort;
        }

        if error.is_rate_limited() {
            if let Some(retry_after) = error.retry_after() {
                return RetryDecision::RetryAfter(retry_after);
            }
        }

        RetryDecision::RetryAfter(self.calculate_delay(attempt_index))
    }

    /// Validate policy configuration for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }

        if self.backoff_multiplier < 1.0 {
            return Err("backoff_multiplier must be >= 1.0".to_string());
        }

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err("jitter_factor must be between 0.0 and 1.0".to_string());
        }

        if self.base_delay > self.max_delay {
            return Err("base_delay cannot exceed max_delay".to_string());
        }

        Ok(())
    }
}
