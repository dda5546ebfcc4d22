use std::time::Duration;

use http::StatusCode;

use super::types::{Error, Kind};

impl Error {
    /// Returns true if the error is from a builder or configuration step.
    #[must_use]
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if the error carries an HTTP status.
    #[must_use]
    pub fn is_status(&self) -> bool {
        matches!(self.inner.kind, Kind::Status { .. })
    }

    /// Returns true if the attempt timed out in the transport.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self.inner.kind, Kind::Timeout)
    }

    /// Returns true for network-level failures with no status.
    #[must_use]
    pub fn is_request(&self) -> bool {
        matches!(self.inner.kind, Kind::Request)
    }

    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self.inner.kind, Kind::Decode)
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        matches!(self.inner.kind, Kind::Disabled)
    }

    /// Returns the status code, if the error was generated from a response.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self.inner.kind {
            Kind::Status { status, .. } => Some(status),
            _ => None,
        }
    }

    /// The server-requested delay from a `Retry-After` header.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self.inner.kind {
            Kind::Status { retry_after, .. } => retry_after,
            _ => None,
        }
    }

    /// 4xx responses other than 429.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status()
            .is_some_and(|s| s.is_client_error() && s != StatusCode::TOO_MANY_REQUESTS)
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| s.is_server_error())
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }

    /// Whether another attempt may succeed: server errors, rate limiting,
    /// timeouts and failures that produced no status at all.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match &self.inner.kind {
            Kind::Request | Kind::Timeout => true,
            Kind::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Kind::Builder | Kind::Decode | Kind::Socket | Kind::NotConnected | Kind::Disabled => {
                false
            }
        }
    }
}
