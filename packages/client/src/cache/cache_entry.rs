//! Cache entry with TTL
//!
//! Entries are immutable once written; an expired entry is treated as absent.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

/// Decoded response body shared between the cache and every caller
pub type Payload = Arc<Value>;

/// Cached response entry with metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: Payload,
    /// Cache creation timestamp
    pub created_at: Instant,
    /// Freshness window measured from `created_at`
    pub ttl: Duration,
}

impl CacheEntry {
    #[must_use]
    pub fn new(payload: Payload, ttl: Duration) -> Self {
        Self {
            payload,
            created_at: Instant::now(),
            ttl,
        }
    }

    /// Valid strictly while `now - created_at < ttl`.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.age() < self.ttl
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        !self.is_fresh()
    }

    /// Calculate age of this cache entry
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}
