//! Diagnostics for the request manager
//!
//! Retry counters and the per-endpoint frequency ledger. Cache counters live
//! with the cache in `crate::cache::cache_stats`.

pub mod frequency;
pub mod retry_stats;

pub use frequency::{EndpointFrequency, FrequencyLedger, LedgerConfig};
pub use retry_stats::{RetryStats, RetryStatsSnapshot};
