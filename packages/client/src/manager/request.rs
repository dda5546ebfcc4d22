//! Request execution: cache lookup, in-flight sharing, retries and write-through

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::de::DeserializeOwned;
use url::Url;

use super::core::{RequestManager, SharedRequest};
use crate::cache::{Payload, RequestSignature};
use crate::config::RequestOptions;
use crate::error::{self, Result};
use crate::http::HttpRequest;
use crate::retry::RetryExecutor;

const X_CSRF_TOKEN: &str = "x-csrf-token";

impl RequestManager {
    /// Issue a request and return the decoded JSON payload.
    ///
    /// A fresh cache entry is returned without touching the network unless
    /// `bypass_cache` is set. Identical requests already in flight are joined
    /// and every caller receives the same payload or the same error. Only
    /// successful payloads are cached.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Payload> {
        let signature = RequestSignature::new(endpoint, &options.method, options.body.as_ref());

        if !options.bypass_cache {
            if let Some(payload) = self.cache.get(&signature) {
                tracing::debug!(target: "civix::cache", signature = %signature, "Cache hit");
                return Ok(payload);
            }
        }

        self.fetch(signature, endpoint, &options).await
    }

    /// `request`, then deserialize the payload into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let payload = self.request(endpoint, options).await?;
        T::deserialize(payload.as_ref()).map_err(|e| error::decode(e).with_endpoint(endpoint))
    }

    /// Join or start the network operation for `signature`.
    pub(super) async fn fetch(
        &self,
        signature: RequestSignature,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<Payload> {
        let operation = match self.pending.entry(signature.clone()) {
            Entry::Occupied(entry) => {
                tracing::debug!(
                    target: "civix::manager",
                    signature = %signature,
                    "Joining in-flight request"
                );
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let request = self.build_request(endpoint, options)?;
                let operation = self.start(signature, endpoint, request, options.cache_timeout);
                entry.insert(operation.clone());
                operation
            }
        };

        operation.await
    }

    /// Spawn the network operation and return a shared handle to its result.
    ///
    /// The operation runs on its own task, so it settles, writes the cache on
    /// success and removes its own pending entry even when every caller has
    /// stopped awaiting it.
    fn start(
        &self,
        signature: RequestSignature,
        endpoint: &str,
        request: HttpRequest,
        ttl: Duration,
    ) -> SharedRequest {
        let transport = Arc::clone(&self.transport);
        let cache = Arc::clone(&self.cache);
        let pending = Arc::clone(&self.pending);
        let ledger = Arc::clone(&self.ledger);
        let stats = Arc::clone(&self.retry_stats);
        let policy = self.config.retry.clone();
        let endpoint = endpoint.to_string();

        tracing::debug!(
            target: "civix::manager",
            method = %request.method,
            url = %request.url,
            "Dispatching request"
        );

        let task = tokio::spawn(async move {
            let result = RetryExecutor::new(
                |_attempt| {
                    ledger.record(&endpoint);
                    let exchange = transport.send(request.clone());
                    async move { exchange.await?.into_json() }
                },
                policy,
            )
            .with_stats(stats)
            .with_label(endpoint.clone())
            .execute()
            .await
            .map(Arc::new)
            .map_err(|e| e.with_endpoint(endpoint.clone()));

            match result {
                Ok(ref payload) => cache.put(signature.clone(), Arc::clone(payload), ttl),
                Err(ref e) => tracing::warn!(
                    target: "civix::manager",
                    signature = %signature,
                    error = %e,
                    "Request failed"
                ),
            }

            pending.remove(&signature);
            result
        });

        async move { task.await.unwrap_or_else(|e| Err(error::request(e))) }
            .boxed()
            .shared()
    }

    /// Resolve the URL and attach default, session and caller headers.
    /// Caller headers are applied last and replace defaults of the same name.
    pub(super) fn build_request(&self, endpoint: &str, options: &RequestOptions) -> Result<HttpRequest> {
        let url = self.resolve(endpoint)?;
        let mut headers = HeaderMap::new();

        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, header_value(&self.config.user_agent)?);

        let body = match options.body {
            Some(ref body) => Some(Bytes::from(serde_json::to_vec(body).map_err(error::builder)?)),
            None => None,
        };
        if body.is_some() && !options.skip_content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        if let Some(session) = self.session.get() {
            if let Some(ref token) = session.token {
                headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
            }
            if let Some(ref cookie) = session.cookie {
                headers.insert(COOKIE, header_value(cookie)?);
            }
            if options.method != Method::GET {
                if let Some(ref csrf) = session.csrf_token {
                    headers.insert(HeaderName::from_static(X_CSRF_TOKEN), header_value(csrf)?);
                }
            }
        }

        for (name, value) in &options.headers {
            headers.insert(name.clone(), value.clone());
        }

        Ok(HttpRequest {
            method: options.method.clone(),
            url,
            headers,
            body,
        })
    }

    /// Absolute endpoints are used as-is; relative ones are appended to the
    /// base URL, keeping any base path.
    fn resolve(&self, endpoint: &str) -> Result<Url> {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Url::parse(endpoint).map_err(|e| error::builder(e).with_endpoint(endpoint));
        }

        let base = self.base_url.as_str().trim_end_matches('/');
        let path = endpoint.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}")).map_err(|e| error::builder(e).with_endpoint(endpoint))
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(error::builder)
}
