//! Cache lookups, writes and invalidation

use std::time::Duration;

use super::super::{
    cache_entry::{CacheEntry, Payload},
    cache_key::RequestSignature,
};
use super::core::ResponseCache;

impl ResponseCache {
    /// Fresh payload for `key`, if any. An expired entry is removed and
    /// reported as a miss.
    pub fn get(&self, key: &RequestSignature) -> Option<Payload> {
        let fresh = match self.entries.get(key) {
            Some(entry) if entry.is_fresh() => Some(entry.payload.clone()),
            Some(_) => None,
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        match fresh {
            Some(payload) => {
                self.stats.record_hit();
                Some(payload)
            }
            None => {
                // Re-check under the write lock; a fresh entry may have replaced it
                if self
                    .entries
                    .remove_if(key, |_, entry| entry.is_expired())
                    .is_some()
                {
                    self.stats.record_evictions(1);
                    tracing::trace!(
                        target: "civix::cache",
                        signature = %key,
                        "Evicted expired entry on access"
                    );
                }
                self.stats.record_miss();
                None
            }
        }
    }

    /// Whether a fresh entry exists, without touching hit/miss counters.
    #[must_use]
    pub fn contains_fresh(&self, key: &RequestSignature) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.is_fresh())
    }

    /// Store a successful payload. Entries are never updated in place: a
    /// write for an existing signature replaces the entry wholesale.
    pub fn put(&self, key: RequestSignature, payload: Payload, ttl: Duration) {
        if !self.config.is_enabled() || ttl.is_zero() {
            return;
        }

        self.entries.insert(key, CacheEntry::new(payload, ttl));
        self.stats.record_write();

        if self.entries.len() > self.config.sweep_threshold {
            let swept = self.cleanup_expired();
            if swept > 0 {
                tracing::debug!(
                    target: "civix::cache",
                    swept,
                    remaining = self.entries.len(),
                    "Swept expired entries"
                );
            }
        }

        if self.entries.len() > self.config.max_entries {
            let evicted = self.evict_oldest(self.entries.len() - self.config.max_entries);
            tracing::debug!(
                target: "civix::cache",
                evicted,
                max_entries = self.config.max_entries,
                "Cache evicted entries due to count limit"
            );
        }
    }

    /// Drop every entry for `endpoint`, whatever its method or body.
    /// Returns the number of entries removed.
    pub fn invalidate_endpoint(&self, endpoint: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.endpoint != endpoint);
        let removed = before.saturating_sub(self.entries.len());
        self.stats.record_evictions(removed as u64);
        removed
    }

    /// Drop every entry whose endpoint starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.endpoint.starts_with(prefix));
        let removed = before.saturating_sub(self.entries.len());
        self.stats.record_evictions(removed as u64);
        removed
    }
}
