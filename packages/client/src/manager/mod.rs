//! Request manager: one entry point for API calls
//!
//! `RequestManager::request` serves fresh cached payloads, joins identical
//! in-flight requests and retries transient failures. `RequestManager::batch`
//! fans a set of independent requests out over the same path.

pub mod batch;
pub mod core;
pub mod request;

pub use self::core::RequestManager;
pub use batch::{BatchRequest, BatchResponse};
