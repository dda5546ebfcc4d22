//! Batched requests
//!
//! Cached entries are answered immediately; everything else is issued
//! concurrently through the regular request path. One failure never affects
//! the other results.

use std::collections::HashMap;

use futures::future::join_all;

use super::core::RequestManager;
use crate::cache::{Payload, RequestSignature};
use crate::config::RequestOptions;
use crate::error::{Error, Result};

/// One entry of a batch
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Result key; the endpoint is used when absent
    pub id: Option<String>,
    pub endpoint: String,
    pub options: RequestOptions,
}

impl BatchRequest {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            id: None,
            endpoint: endpoint.into(),
            options: RequestOptions::default(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    fn key(&self) -> String {
        self.id.clone().unwrap_or_else(|| self.endpoint.clone())
    }
}

/// Per-request outcomes keyed by id (or endpoint)
#[derive(Debug, Default)]
pub struct BatchResponse {
    results: HashMap<String, Result<Payload>>,
}

impl BatchResponse {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Result<Payload>> {
        self.results.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &Payload)> {
        self.results
            .iter()
            .filter_map(|(key, result)| result.as_ref().ok().map(|payload| (key.as_str(), payload)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.results
            .iter()
            .filter_map(|(key, result)| result.as_ref().err().map(|e| (key.as_str(), e)))
    }

    #[must_use]
    pub fn into_inner(self) -> HashMap<String, Result<Payload>> {
        self.results
    }
}

impl RequestManager {
    /// Run several requests together.
    ///
    /// Entries that share a key overwrite each other; the last one wins.
    pub async fn batch(&self, requests: impl IntoIterator<Item = BatchRequest>) -> BatchResponse {
        let mut results = HashMap::new();
        let mut outstanding = Vec::new();

        for request in requests {
            let key = request.key();
            let signature = RequestSignature::new(
                &request.endpoint,
                &request.options.method,
                request.options.body.as_ref(),
            );

            if !request.options.bypass_cache {
                if let Some(payload) = self.cache.get(&signature) {
                    results.insert(key, Ok(payload));
                    continue;
                }
            }

            outstanding.push(async move {
                let outcome = self
                    .fetch(signature, &request.endpoint, &request.options)
                    .await;
                (key, outcome)
            });
        }

        let cached = results.len();
        let issued = outstanding.len();

        for (key, outcome) in join_all(outstanding).await {
            if let Err(ref e) = outcome {
                tracing::warn!(target: "civix::manager", key = %key, error = %e, "Batch entry failed");
            }
            results.insert(key, outcome);
        }

        tracing::debug!(target: "civix::manager", cached, issued, "Batch completed");

        BatchResponse { results }
    }
}
