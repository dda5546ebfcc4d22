//! RequestManager structure, construction and administration

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use url::Url;

use crate::cache::{CacheStatsSnapshot, Payload, RequestSignature, ResponseCache};
use crate::config::ClientConfig;
use crate::error::{self, Result};
use crate::session::SessionStore;
use crate::telemetry::{EndpointFrequency, FrequencyLedger, RetryStats, RetryStatsSnapshot};
use crate::transport::{HyperTransport, Transport};

/// In-flight operation shared by every caller with the same signature
pub(crate) type SharedRequest = Shared<BoxFuture<'static, Result<Payload>>>;

/// Deduplicating, caching, retrying API client.
///
/// All state is owned by the instance; build one per application context and
/// share it behind an `Arc`.
pub struct RequestManager {
    pub(super) config: ClientConfig,
    pub(super) base_url: Url,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) session: Arc<SessionStore>,
    pub(super) cache: Arc<ResponseCache>,
    pub(super) pending: Arc<DashMap<RequestSignature, SharedRequest>>,
    pub(super) ledger: Arc<FrequencyLedger>,
    pub(super) retry_stats: Arc<RetryStats>,
}

impl std::fmt::Debug for RequestManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestManager")
            .field("base_url", &self.base_url.as_str())
            .field("cached", &self.cache.len())
            .field("in_flight", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl RequestManager {
    /// Build a manager over an explicit transport.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or no base URL can be resolved.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        session: Arc<SessionStore>,
    ) -> Result<Self> {
        config.validate().map_err(error::builder)?;
        let base_url = config.base_url().map_err(error::builder)?;

        tracing::debug!(
            target: "civix::manager",
            base_url = %base_url,
            max_attempts = config.retry.max_attempts,
            "Request manager initialized"
        );

        Ok(Self {
            cache: Arc::new(ResponseCache::new(config.cache.clone())),
            ledger: Arc::new(FrequencyLedger::new(config.ledger.clone())),
            pending: Arc::new(DashMap::new()),
            retry_stats: Arc::new(RetryStats::new()),
            config,
            base_url,
            transport,
            session,
        })
    }

    /// Build a manager over the hyper/rustls transport.
    pub fn http(config: ClientConfig, session: Arc<SessionStore>) -> Result<Self> {
        let transport = HyperTransport::new(config.request_timeout)?;
        Self::new(config, Arc::new(transport), session)
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Drop every cached entry for `endpoint`, any method or body.
    pub fn invalidate(&self, endpoint: &str) -> usize {
        let removed = self.cache.invalidate_endpoint(endpoint);
        tracing::debug!(target: "civix::cache", endpoint, removed, "Invalidated endpoint");
        removed
    }

    /// Drop every cached entry under an endpoint prefix, e.g. `/users/5/`.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.cache.invalidate_prefix(prefix)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }

    #[must_use]
    pub fn retry_stats(&self) -> RetryStatsSnapshot {
        self.retry_stats.snapshot()
    }

    /// Attempts recorded against `endpoint` in the ledger windows
    #[must_use]
    pub fn frequency(&self, endpoint: &str) -> EndpointFrequency {
        self.ledger.frequency(endpoint)
    }

    /// Distinct signatures with a network operation outstanding
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}
