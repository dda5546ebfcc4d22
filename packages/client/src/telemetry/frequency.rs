//! Per-endpoint request frequency ledger
//!
//! Records a timestamp for every attempt, prunes to a rolling window and logs
//! bursts. Purely diagnostic: it never delays or rejects a request.

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::DashMap;
use serde::Deserialize;
use tokio::time::Instant;

/// Ledger windows and burst threshold
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// How long timestamps are kept
    #[serde(deserialize_with = "crate::config::serde_ext::duration_ms")]
    pub retention: Duration,
    /// Window used for burst detection
    #[serde(deserialize_with = "crate::config::serde_ext::duration_ms")]
    pub burst_window: Duration,
    /// Attempts inside `burst_window` that count as a burst
    pub burst_threshold: usize,
    /// Once more endpoints than this are tracked, recording sweeps out
    /// endpoints with nothing left in the retention window
    pub sweep_threshold: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(600),
            burst_window: Duration::from_secs(10),
            burst_threshold: 20,
            sweep_threshold: 256,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.burst_window > self.retention {
            return Err("burst_window cannot exceed retention".to_string());
        }
        if self.burst_threshold == 0 {
            return Err("burst_threshold must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Attempt counts for one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointFrequency {
    /// Attempts inside the retention window
    pub total: usize,
    /// Attempts inside the burst window
    pub recent: usize,
}

#[derive(Debug)]
pub struct FrequencyLedger {
    config: LedgerConfig,
    entries: DashMap<String, VecDeque<Instant>>,
}

impl FrequencyLedger {
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
        }
    }

    /// Record an attempt against `endpoint`. Returns true when the attempt
    /// pushed the endpoint over the burst threshold.
    pub fn record(&self, endpoint: &str) -> bool {
        let now = Instant::now();
        let recent = {
            let mut timestamps = self.entries.entry(endpoint.to_string()).or_default();
            Self::prune(&mut timestamps, now, self.config.retention);
            timestamps.push_back(now);
            Self::count_since(&timestamps, now, self.config.burst_window)
        };

        if self.entries.len() > self.config.sweep_threshold {
            self.sweep(now);
        }

        let burst = recent == self.config.burst_threshold;
        if burst {
            tracing::warn!(
                target: "civix::telemetry",
                endpoint,
                recent,
                window_ms = u64::try_from(self.config.burst_window.as_millis()).unwrap_or(u64::MAX),
                "Request burst detected"
            );
        }
        burst
    }

    #[must_use]
    pub fn frequency(&self, endpoint: &str) -> EndpointFrequency {
        let now = Instant::now();
        match self.entries.get_mut(endpoint) {
            Some(mut timestamps) => {
                Self::prune(&mut timestamps, now, self.config.retention);
                EndpointFrequency {
                    total: timestamps.len(),
                    recent: Self::count_since(&timestamps, now, self.config.burst_window),
                }
            }
            None => EndpointFrequency {
                total: 0,
                recent: 0,
            },
        }
    }

    /// Endpoints with at least one attempt in the retention window
    #[must_use]
    pub fn endpoints(&self) -> Vec<String> {
        self.sweep(Instant::now());
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Endpoints currently tracked, stale ones not yet swept included
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.entries.len()
    }

    fn sweep(&self, now: Instant) {
        self.entries.retain(|_, timestamps| {
            Self::prune(timestamps, now, self.config.retention);
            !timestamps.is_empty()
        });
    }

    fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, retention: Duration) {
        while let Some(front) = timestamps.front() {
            if now.duration_since(*front) >= retention {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn count_since(timestamps: &VecDeque<Instant>, now: Instant, window: Duration) -> usize {
        timestamps
            .iter()
            .rev()
            .take_while(|at| now.duration_since(**at) < window)
            .count()
    }
}
