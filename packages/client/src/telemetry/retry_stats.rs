//! Retry statistics for a single request manager
//!
//! Atomic counters updated by the retry executor; read through `snapshot`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_utils::CachePadded;

/// Retry counters, cache padded to avoid false sharing between workers
#[derive(Debug, Default)]
pub struct RetryStats {
    operations: CachePadded<AtomicU64>,
    retries: CachePadded<AtomicU64>,
    successes: CachePadded<AtomicU64>,
    failures: CachePadded<AtomicU64>,
    delay_millis: CachePadded<AtomicU64>,
}

/// Immutable snapshot of `RetryStats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryStatsSnapshot {
    /// Operations started (one per executor run, not per attempt)
    pub operations: u64,
    /// Retries scheduled
    pub retries: u64,
    pub successes: u64,
    pub failures: u64,
    /// Total time spent sleeping between attempts
    pub total_delay: Duration,
}

impl RetryStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_operation(&self) {
        self.operations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_retry(&self, delay: Duration) {
        self.retries.fetch_add(1, Ordering::Relaxed);
        self.delay_millis.fetch_add(
            u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
    }

    #[inline]
    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn snapshot(&self) -> RetryStatsSnapshot {
        RetryStatsSnapshot {
            operations: self.operations.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            total_delay: Duration::from_millis(self.delay_millis.load(Ordering::Relaxed)),
        }
    }
}

impl RetryStatsSnapshot {
    /// Average retries per operation
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_retries_per_operation(&self) -> f64 {
        if self.operations > 0 {
            self.retries as f64 / self.operations as f64
        } else {
            0.0
        }
    }
}
