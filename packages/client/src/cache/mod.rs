//! Response caching keyed by request signature
//!
//! - TTL per entry, checked on every read (expired entries are evicted lazily)
//! - Sweep of expired entries once the map grows past a threshold
//! - Only successful payloads are ever written
//! - Cache hits share the stored `Arc<Value>` without copying

pub mod cache_config;
pub mod cache_entry;
pub mod cache_key;
pub mod cache_stats;
pub mod response_cache;

pub use cache_config::CacheConfig;
pub use cache_entry::{CacheEntry, Payload};
pub use cache_key::RequestSignature;
pub use cache_stats::{CacheStats, CacheStatsSnapshot};
pub use response_cache::ResponseCache;
