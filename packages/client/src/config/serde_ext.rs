//! Deserialization helpers for configuration types the `http` crate and std
//! do not give serde impls for.

use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::de::{self, Deserialize, Deserializer};

/// Durations are written as integer milliseconds.
pub fn duration_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

pub fn method<'de, D>(deserializer: D) -> Result<Method, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).map_err(de::Error::custom)
}

pub fn header_map<'de, D>(deserializer: D) -> Result<HeaderMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = std::collections::BTreeMap::<String, String>::deserialize(deserializer)?;
    let mut headers = HeaderMap::with_capacity(raw.len());
    for (name, value) in raw {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(de::Error::custom)?;
        let value = HeaderValue::from_str(&value).map_err(de::Error::custom)?;
        headers.insert(name, value);
    }
    Ok(headers)
}
