//! Per-request credentials
//!
//! The `SessionStore` shared with the manager normally supplies these; the
//! methods here override it for a single request.

use http::{HeaderName, HeaderValue};

use crate::builder::core::ApiBuilder;
use crate::builder::headers::header;

impl<S> ApiBuilder<S> {
    /// Set bearer token authentication header
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use civix::{ApiBuilder, RequestManager};
    ///
    /// # async fn run(manager: Arc<RequestManager>) -> civix::Result<()> {
    /// let me: serde_json::Value = ApiBuilder::new(&manager)
    ///     .bearer_auth("your-session-token")
    ///     .get("/auth/me")
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn bearer_auth(self, token: &str) -> Self {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(value) => self.header(header::AUTHORIZATION, value),
            Err(_) => self, // Skip invalid header value
        }
    }

    /// Send an explicit `Cookie` header
    #[must_use]
    pub fn cookie(self, cookie: &str) -> Self {
        match HeaderValue::from_str(cookie) {
            Ok(value) => self.header(header::COOKIE, value),
            Err(_) => self,
        }
    }

    #[must_use]
    pub fn csrf_token(self, token: &str) -> Self {
        match HeaderValue::from_str(token) {
            Ok(value) => self.header(HeaderName::from_static(header::X_CSRF_TOKEN), value),
            Err(_) => self,
        }
    }
}
