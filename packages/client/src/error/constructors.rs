use std::time::Duration;

use http::{HeaderMap, StatusCode};

use super::types::{Error, Kind};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Creates an `Error` for a builder error.
pub fn builder<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Builder).with(e.into())
}

/// Creates an `Error` for a network-level request failure.
pub fn request<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Request).with(e.into())
}

/// Creates an `Error` for a decode error.
pub fn decode<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Decode).with(e.into())
}

/// Creates an `Error` for an attempt that exceeded the transport timeout.
pub fn timeout(after: Duration) -> Error {
    Error::new(Kind::Timeout).with(format!("no response after {}ms", after.as_millis()))
}

/// Creates an `Error` for a non-success status, reading `Retry-After` from the
/// response headers when the server sent one.
pub fn status(status: StatusCode, headers: &HeaderMap) -> Error {
    Error::new(Kind::Status {
        status,
        retry_after: parse_retry_after(headers),
    })
}

/// Creates an `Error` for a WebSocket transport failure.
pub fn socket<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Socket).with(e.into())
}

pub fn not_connected() -> Error {
    Error::new(Kind::NotConnected)
}

pub fn disabled() -> Error {
    Error::new(Kind::Disabled)
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored and the
/// caller falls back to its own backoff.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(http::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
