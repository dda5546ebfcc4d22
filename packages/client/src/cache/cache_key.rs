//! Request signatures
//!
//! A `RequestSignature` identifies logically identical requests for both
//! caching and in-flight deduplication: endpoint, method and a digest of the
//! serialized body.

use std::fmt;

use http::Method;
use ring::digest::{SHA256, digest};
use serde_json::Value;

/// Cache and dedup key for a request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestSignature {
    /// Endpoint path as the caller passed it
    pub endpoint: String,
    pub method: Method,
    /// Hex SHA-256 of the serialized body, empty when there is no body
    pub body_digest: String,
}

impl RequestSignature {
    /// Build the signature for a request.
    ///
    /// The whole body is hashed and the full digest kept, so two different
    /// bodies never share a signature in practice.
    #[must_use]
    pub fn new(endpoint: &str, method: &Method, body: Option<&Value>) -> Self {
        let body_digest = match body {
            Some(body) => {
                let mut canonical = String::new();
                write_canonical(body, &mut canonical);
                hex::encode(digest(&SHA256, canonical.as_bytes()))
            }
            None => String::new(),
        };

        Self {
            endpoint: endpoint.to_string(),
            method: method.clone(),
            body_digest,
        }
    }
}

/// Compact JSON with object keys sorted, independent of map ordering features.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body_digest.is_empty() {
            write!(f, "{} {}", self.method, self.endpoint)
        } else {
            write!(f, "{} {} #{}", self.method, self.endpoint, &self.body_digest[..12])
        }
    }
}
