//! Buffered API response

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::error::{self, Result};

/// Fully buffered HTTP response returned by a `Transport`
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// JSON response with the given status
    #[must_use]
    pub fn json(status: StatusCode, value: &Value) -> Self {
        let mut response = Self::new(status, value.to_string());
        response.headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        response
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Turn the response into the parsed JSON body, or a status error.
    /// An empty success body decodes to `Value::Null`.
    pub fn into_json(self) -> Result<Value> {
        if !self.status.is_success() {
            let err = error::status(self.status, &self.headers);
            return Err(match server_message(&self.body) {
                Some(message) => err.with(message),
                None => err,
            });
        }

        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&self.body).map_err(error::decode)
    }
}

/// `error` or `message` field of a JSON error body
fn server_message(body: &Bytes) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .get("error")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
