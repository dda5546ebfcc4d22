//! Header management
//!
//! Caller headers replace the defaults the manager attaches (`Accept`,
//! `Content-Type`, session credentials) when the names collide.

use http::{HeaderName, HeaderValue};

use crate::builder::core::ApiBuilder;

/// Header constants for common HTTP headers
pub mod header {
    pub use http::header::*;

    /// CSRF token header checked by the API on mutating requests
    pub const X_CSRF_TOKEN: &str = "x-csrf-token";
}

impl<S> ApiBuilder<S> {
    /// Add a custom header to the request
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use civix::{ApiBuilder, RequestManager};
    /// use http::{HeaderName, HeaderValue};
    ///
    /// # async fn run(manager: Arc<RequestManager>) -> civix::Result<()> {
    /// let stats: serde_json::Value = ApiBuilder::new(&manager)
    ///     .header(
    ///         HeaderName::from_static("x-client-build"),
    ///         HeaderValue::from_static("412"),
    ///     )
    ///     .get("/stats")
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn header(mut self, key: HeaderName, value: HeaderValue) -> Self {
        self.options.headers.insert(key, value);
        self
    }

    /// Add a header from strings. Invalid names or values are skipped.
    #[must_use]
    pub fn header_str(self, key: &str, value: &str) -> Self {
        match (HeaderName::try_from(key), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => self.header(name, value),
            _ => {
                tracing::warn!(target: "civix::builder", header = key, "Skipping invalid header");
                self
            }
        }
    }

    /// Add several headers at once
    #[must_use]
    pub fn headers<'a>(self, headers: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        headers
            .into_iter()
            .fold(self, |builder, (key, value)| builder.header_str(key, value))
    }

    /// Do not send `Content-Type: application/json`, e.g. for form uploads
    #[must_use]
    pub fn skip_content_type(mut self) -> Self {
        self.options.skip_content_type = true;
        self
    }
}
