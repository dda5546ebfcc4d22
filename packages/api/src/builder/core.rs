//! Core `ApiBuilder` structures and base functionality
//!
//! Contains the `ApiBuilder` struct, its body state markers and the
//! per-request cache controls.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use civix_client::{Error, RequestManager, RequestOptions};

/// State marker indicating no body has been set
#[derive(Debug, Clone, Copy)]
pub struct BodyNotSet;

/// State marker indicating a body has been set
#[derive(Debug, Clone, Copy)]
pub struct BodySet;

/// Fluent request builder over a shared `RequestManager`
///
/// Type parameter `S` tracks the body state:
/// - `BodyNotSet`: `get` and `delete` available, `body` moves to `BodySet`
/// - `BodySet`: `post`, `put` and `patch` available
#[derive(Clone)]
pub struct ApiBuilder<S = BodyNotSet> {
    pub(crate) manager: Arc<RequestManager>,
    pub(crate) options: RequestOptions,
    /// Failure recorded while building, reported when the request executes
    pub(crate) error: Option<Error>,
    pub(crate) debug_enabled: bool,
    pub(crate) state: S,
}

impl ApiBuilder<BodyNotSet> {
    /// Start building a request against `manager`
    #[must_use]
    pub fn new(manager: &Arc<RequestManager>) -> Self {
        Self {
            manager: Arc::clone(manager),
            options: RequestOptions::default(),
            error: None,
            debug_enabled: false,
            state: BodyNotSet,
        }
    }
}

impl<S> ApiBuilder<S> {
    /// Skip the cache lookup; a successful response still refreshes it
    #[must_use]
    pub fn bypass_cache(mut self) -> Self {
        self.options.bypass_cache = true;
        self
    }

    /// Freshness window for this response
    #[must_use]
    pub fn cache_timeout(mut self, ttl: Duration) -> Self {
        self.options.cache_timeout = ttl;
        self
    }

    /// Log the request and its outcome at debug level
    #[must_use]
    pub fn debug(mut self) -> Self {
        self.debug_enabled = true;
        self
    }

    /// Options accumulated so far
    #[must_use]
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub(crate) fn with_state<T>(self, state: T) -> ApiBuilder<T> {
        ApiBuilder {
            manager: self.manager,
            options: self.options,
            error: self.error,
            debug_enabled: self.debug_enabled,
            state,
        }
    }
}

impl<S> fmt::Debug for ApiBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiBuilder")
            .field("options", &self.options)
            .field("error", &self.error)
            .field("debug_enabled", &self.debug_enabled)
            .finish_non_exhaustive()
    }
}
