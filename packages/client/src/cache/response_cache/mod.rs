//! Response cache modules
//!
//! - `core`: ResponseCache struct and basic initialization
//! - `operations`: lookups, writes and invalidation
//! - `eviction`: expired-entry sweeps and count-limit eviction

pub mod core;
pub mod eviction;
pub mod operations;

pub use core::ResponseCache;
