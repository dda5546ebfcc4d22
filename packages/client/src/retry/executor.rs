use std::future::Future;
use std::sync::Arc;

use super::policy::{RetryDecision, RetryPolicy};
use crate::error::Result;
use crate::telemetry::RetryStats;

/// Drives an async operation through a `RetryPolicy`.
///
/// The operation is called once per attempt with the zero-based attempt
/// index. Only the final outcome leaves the executor; intermediate failures
/// are logged and counted.
pub struct RetryExecutor<F> {
    operation: F,
    policy: RetryPolicy,
    stats: Option<Arc<RetryStats>>,
    label: String,
}

impl<F, Fut, T> RetryExecutor<F>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    /// Create new retry executor for an operation
    pub fn new(operation: F, policy: RetryPolicy) -> Self {
        Self {
            operation,
            policy,
            stats: None,
            label: String::new(),
        }
    }

    #[must_use]
    pub fn with_stats(mut self, stats: Arc<RetryStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Name used in log records, usually the endpoint
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Run attempts until one succeeds, the error is not retryable, or the
    /// attempt budget is spent. The last error is returned on failure.
    pub async fn execute(mut self) -> Result<T> {
        if let Some(ref stats) = self.stats {
            stats.record_operation();
        }

        let mut attempt_index = 0u32;
        loop {
            match (self.operation)(attempt_index).await {
                Ok(value) => {
                    if let Some(ref stats) = self.stats {
                        stats.record_success();
                    }
                    return Ok(value);
                }
                Err(error) => match self.policy.decide(&error, attempt_index) {
                    RetryDecision::Abort => {
                        tracing::debug!(
                            target: "civix::retry",
                            label = %self.label,
                            attempts = attempt_index + 1,
                            error = %error,
                            "Giving up"
                        );
                        if let Some(ref stats) = self.stats {
                            stats.record_failure();
                        }
                        return Err(error);
                    }
                    RetryDecision::RetryAfter(delay) => {
                        tracing::warn!(
                            target: "civix::retry",
                            label = %self.label,
                            attempt = attempt_index + 1,
                            max_attempts = self.policy.max_attempts,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %error,
                            "Attempt failed, retrying"
                        );
                        if let Some(ref stats) = self.stats {
                            stats.record_retry(delay);
                        }
                        tokio::time::sleep(delay).await;
                        attempt_index += 1;
                    }
                },
            }
        }
    }
}

/// Run `operation` under `policy`.
pub async fn with_retry<F, Fut, T>(policy: RetryPolicy, operation: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    RetryExecutor::new(operation, policy).execute().await
}
