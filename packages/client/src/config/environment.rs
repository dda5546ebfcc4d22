//! Deployment environment detection and backend origin selection
//!
//! The effective API and socket origins are chosen at runtime from the
//! hostname the client is deployed under, never hardcoded at call sites.

use serde::Deserialize;
use url::Url;

use super::ConfigError;

/// Environment variable consulted when no hostname is configured explicitly.
pub const HOST_ENV_VAR: &str = "CIVIX_HOST";

const LOCAL_HOSTS: [&str; 4] = ["localhost", "127.0.0.1", "::1", "0.0.0.0"];

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Local,
}

impl Environment {
    /// Classify a hostname.
    ///
    /// Loopback names and `*.local` are local; configured staging hosts and
    /// names starting with `dev.` or `staging.` are staging; anything else is
    /// production.
    #[must_use]
    pub fn detect(hostname: &str, config: &EnvironmentConfig) -> Self {
        let host = hostname.trim().trim_end_matches('.').to_ascii_lowercase();

        if LOCAL_HOSTS.contains(&host.as_str()) || host.ends_with(".local") {
            return Environment::Local;
        }

        let is_staging = config
            .staging_hosts
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(&host))
            || host.starts_with("dev.")
            || host.starts_with("staging.");

        if is_staging {
            Environment::Staging
        } else {
            Environment::Production
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Local => "local",
        }
    }
}

/// Hostnames and origins for each environment
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Hostname to classify. Falls back to `CIVIX_HOST`, then the machine hostname.
    pub hostname: Option<String>,
    /// Forces an environment regardless of hostname
    pub force: Option<Environment>,
    /// Extra hostnames treated as staging
    pub staging_hosts: Vec<String>,
    pub production_api: String,
    pub staging_api: String,
    pub local_api: String,
    /// Path of the messaging socket on the API origin
    pub socket_path: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            hostname: None,
            force: None,
            staging_hosts: Vec::new(),
            production_api: "https://api.civix.app".to_string(),
            staging_api: "https://dev-api.civix.app".to_string(),
            local_api: "http://localhost:3001".to_string(),
            socket_path: "/ws".to_string(),
        }
    }
}

impl EnvironmentConfig {
    /// Configuration pinned to a single origin, used by tests and tools that
    /// talk to one known backend.
    #[must_use]
    pub fn fixed(origin: &str) -> Self {
        Self {
            force: Some(Environment::Local),
            local_api: origin.to_string(),
            ..Self::default()
        }
    }

    /// The hostname this process is deployed under.
    #[must_use]
    pub fn resolve_hostname(&self) -> String {
        if let Some(ref hostname) = self.hostname {
            return hostname.clone();
        }
        if let Ok(hostname) = std::env::var(HOST_ENV_VAR) {
            return hostname;
        }
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string())
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        match self.force {
            Some(environment) => environment,
            None => Environment::detect(&self.resolve_hostname(), self),
        }
    }

    /// Effective REST origin for the detected environment.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let environment = self.environment();
        let raw = match environment {
            Environment::Production => &self.production_api,
            Environment::Staging => &self.staging_api,
            Environment::Local => &self.local_api,
        };
        let url = Url::parse(raw).map_err(|source| ConfigError::Url {
            url: raw.clone(),
            source,
        })?;
        tracing::debug!(
            target: "civix::config",
            environment = environment.as_str(),
            base_url = %url,
            "Resolved API origin"
        );
        Ok(url)
    }

    /// WebSocket origin: the API origin with a `ws`/`wss` scheme and the
    /// socket path.
    pub fn socket_url(&self) -> Result<Url, ConfigError> {
        let mut url = self.base_url()?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| ConfigError::Invalid(format!("cannot derive socket URL from {url}")))?;
        url.set_path(&self.socket_path);
        Ok(url)
    }
}
