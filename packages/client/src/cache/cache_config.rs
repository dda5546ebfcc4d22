//! Cache configuration and preset policies

use serde::Deserialize;

/// Cache limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Once the map holds more entries than this, writes trigger a sweep of
    /// expired entries
    pub sweep_threshold: usize,
    /// Hard cap; oldest entries are evicted beyond it. Zero disables caching.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_threshold: 100,
            max_entries: 1000,
        }
    }
}

impl CacheConfig {
    /// Create aggressive caching configuration
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            sweep_threshold: 500,
            max_entries: 5000,
        }
    }

    /// Create conservative caching configuration
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            sweep_threshold: 50,
            max_entries: 200,
        }
    }

    /// Create no-cache configuration (disabled caching)
    #[must_use]
    pub fn no_cache() -> Self {
        Self {
            sweep_threshold: 0,
            max_entries: 0,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.max_entries > 0
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.is_enabled() && self.sweep_threshold > self.max_entries {
            return Err("sweep_threshold cannot exceed max_entries".to_string());
        }
        Ok(())
    }
}
