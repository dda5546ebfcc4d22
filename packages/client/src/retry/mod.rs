//! Retry logic with exponential backoff and `Retry-After` support
//!
//! Client errors are never retried; server, network and rate-limit failures
//! are retried within a bounded attempt budget.

pub mod executor;
pub mod policy;

pub use executor::{RetryExecutor, with_retry};
pub use policy::{RetryDecision, RetryPolicy};
