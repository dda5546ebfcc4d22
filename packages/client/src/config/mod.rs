//! Configuration for the request manager and messaging client
//!
//! Plain structs with defaults, named presets and `validate()`, loadable from
//! JSON with durations written in milliseconds.

pub mod client;
pub mod environment;
pub mod messaging;
pub mod request;
pub mod serde_ext;

pub use client::ClientConfig;
pub use environment::{Environment, EnvironmentConfig};
pub use messaging::MessagingConfig;
pub use request::{DEFAULT_CACHE_TIMEOUT, RequestOptions};

/// Errors loading or resolving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid origin {url:?}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{0}")]
    Invalid(String),
}
