//! Per-request options
//!
//! Every option the request manager recognizes, with its default. Unknown keys
//! are rejected when options are deserialized.

use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Deserialize;
use serde_json::Value;

/// Default freshness window for cached responses
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Options for a single `RequestManager::request` call
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct RequestOptions {
    /// HTTP method, `GET` by default
    #[serde(deserialize_with = "super::serde_ext::method")]
    pub method: Method,
    /// JSON request body
    pub body: Option<Value>,
    /// Extra headers; these win over the defaults the manager attaches
    #[serde(deserialize_with = "super::serde_ext::header_map")]
    pub headers: HeaderMap,
    /// Skip the cache lookup (the result is still written on success)
    pub bypass_cache: bool,
    /// Freshness window for the cached result
    #[serde(deserialize_with = "super::serde_ext::duration_ms")]
    pub cache_timeout: Duration,
    /// Do not attach `Content-Type: application/json`
    pub skip_content_type: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: HeaderMap::new(),
            bypass_cache: false,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            skip_content_type: false,
        }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn post(body: Value) -> Self {
        Self::default().method(Method::POST).body(body)
    }

    #[must_use]
    pub fn put(body: Value) -> Self {
        Self::default().method(Method::PUT).body(body)
    }

    #[must_use]
    pub fn patch(body: Value) -> Self {
        Self::default().method(Method::PATCH).body(body)
    }

    #[must_use]
    pub fn delete() -> Self {
        Self::default().method(Method::DELETE)
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn bypass_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }

    #[must_use]
    pub fn cache_timeout(mut self, ttl: Duration) -> Self {
        self.cache_timeout = ttl;
        self
    }

    #[must_use]
    pub fn skip_content_type(mut self) -> Self {
        self.skip_content_type = true;
        self
    }
}
