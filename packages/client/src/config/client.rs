//! Top-level client configuration and presets
//!
//! Aggregates every configuration section and loads them from JSON.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::environment::EnvironmentConfig;
use super::messaging::MessagingConfig;
use super::ConfigError;
use crate::cache::CacheConfig;
use crate::retry::RetryPolicy;
use crate::telemetry::LedgerConfig;

/// Complete configuration for a `RequestManager` and `MessagingClient`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub environment: EnvironmentConfig,
    pub retry: RetryPolicy,
    pub cache: CacheConfig,
    pub ledger: LedgerConfig,
    pub messaging: MessagingConfig,
    /// Deadline applied by the transport to every individual attempt
    #[serde(deserialize_with = "super::serde_ext::duration_ms")]
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: EnvironmentConfig::default(),
            retry: RetryPolicy::default(),
            cache: CacheConfig::default(),
            ledger: LedgerConfig::default(),
            messaging: MessagingConfig::default(),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("civix/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Configuration pointed at a single known origin.
    ///
    /// # Examples
    /// ```
    /// use civix_client::config::ClientConfig;
    ///
    /// let config = ClientConfig::for_origin("http://127.0.0.1:3001");
    /// assert_eq!(config.base_url().unwrap().as_str(), "http://127.0.0.1:3001/");
    /// ```
    #[must_use]
    pub fn for_origin(origin: &str) -> Self {
        Self {
            environment: EnvironmentConfig::fixed(origin),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration document. Missing sections
    /// take their defaults; unknown keys are an error.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Preset for flaky mobile links: more attempts, longer cache windows.
    #[must_use]
    pub fn resilient() -> Self {
        Self {
            retry: RetryPolicy::aggressive(),
            cache: CacheConfig::aggressive(),
            messaging: MessagingConfig {
                max_reconnect_attempts: 10,
                ..MessagingConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        self.environment.base_url()
    }

    pub fn socket_url(&self) -> Result<Url, ConfigError> {
        self.environment.socket_url()
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value found.
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout.is_zero() {
            return Err("request_timeout must be greater than zero".to_string());
        }
        if self.request_timeout > Duration::from_secs(3600) {
            return Err("request_timeout must not exceed 1 hour".to_string());
        }
        if self.user_agent.is_empty() {
            return Err("user_agent cannot be empty".to_string());
        }
        self.retry.validate()?;
        self.cache.validate()?;
        self.ledger.validate()?;
        self.messaging.validate()?;
        Ok(())
    }
}
