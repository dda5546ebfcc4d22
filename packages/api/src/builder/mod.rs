//! Fluent request builder
//!
//! `ApiBuilder` accumulates per-request options and runs the request through a
//! shared `RequestManager`, so cache, deduplication and retries apply.

pub mod auth;
pub mod body;
pub mod core;
pub mod headers;
pub mod methods;

pub use self::core::*;
pub use headers::*;
