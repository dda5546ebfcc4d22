//! Core ResponseCache structure and initialization
//!
//! Sharded concurrent storage keyed by request signature, plus counters.

use dashmap::DashMap;

use super::super::{
    cache_config::CacheConfig, cache_entry::CacheEntry, cache_key::RequestSignature,
    cache_stats::{CacheStats, CacheStatsSnapshot},
};

/// In-memory response cache owned by one request manager
#[derive(Debug)]
pub struct ResponseCache {
    /// Main cache storage (signature -> entry)
    pub(super) entries: DashMap<RequestSignature, CacheEntry>,
    pub(super) config: CacheConfig,
    pub(super) stats: CacheStats,
}

impl ResponseCache {
    /// Create new response cache with configuration
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot(self.entries.len())
    }

    /// Stored entries, expired ones not yet evicted included
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all cached entries
    pub fn clear(&self) {
        let removed = self.entries.len();
        self.entries.clear();
        self.stats.record_evictions(removed as u64);
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
