//! Expired-entry sweeps and count-limit eviction

use tokio::time::Instant;

use super::super::cache_key::RequestSignature;
use super::core::ResponseCache;

impl ResponseCache {
    /// Remove every expired entry. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh());
        let removed = before.saturating_sub(self.entries.len());
        self.stats.record_evictions(removed as u64);
        removed
    }

    /// Evict the `count` oldest entries
    pub(super) fn evict_oldest(&self, count: usize) -> usize {
        let mut candidates: Vec<(RequestSignature, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().created_at))
            .collect();

        candidates.sort_by_key(|(_, created_at)| *created_at);

        let mut evicted = 0;
        for (key, _) in candidates.into_iter().take(count) {
            if self.entries.remove(&key).is_some() {
                evicted += 1;
            }
        }
        self.stats.record_evictions(evicted as u64);
        evicted
    }
}
