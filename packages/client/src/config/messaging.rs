//! Messaging socket configuration

use std::time::Duration;

use serde::Deserialize;

/// Reconnect budget and buffering for the messaging client
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessagingConfig {
    /// Consecutive failed connection attempts before the client disables itself
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect; doubles on every further attempt
    #[serde(deserialize_with = "super::serde_ext::duration_ms")]
    pub reconnect_base_delay: Duration,
    #[serde(deserialize_with = "super::serde_ext::duration_ms")]
    pub reconnect_max_delay: Duration,
    /// Capacity of the outgoing frame queue
    pub outgoing_buffer: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            reconnect_base_delay: Duration::from_millis(1000),
            reconnect_max_delay: Duration::from_secs(30),
            outgoing_buffer: 64,
        }
    }
}

impl MessagingConfig {
    /// Delay before reconnect attempt `attempt_index` (zero based).
    #[must_use]
    pub fn reconnect_delay(&self, attempt_index: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt_index);
        self.reconnect_base_delay
            .saturating_mul(factor)
            .min(self.reconnect_max_delay)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_reconnect_attempts == 0 {
            return Err("max_reconnect_attempts must be at least 1".to_string());
        }
        if self.outgoing_buffer == 0 {
            return Err("outgoing_buffer must be greater than zero".to_string());
        }
        if self.reconnect_base_delay > self.reconnect_max_delay {
            return Err("reconnect_base_delay cannot exceed reconnect_max_delay".to_string());
        }
        Ok(())
    }
}
