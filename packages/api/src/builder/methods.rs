//! HTTP method implementations
//!
//! Terminal methods that run the request through the manager and decode the
//! payload into the caller's type.

use http::Method;
use serde::de::DeserializeOwned;

use crate::builder::core::{ApiBuilder, BodyNotSet, BodySet};
use civix_client::{Payload, Result};

// Terminal methods for BodyNotSet (no body required)
impl ApiBuilder<BodyNotSet> {
    /// Execute a GET request and decode the response
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use civix::{ApiBuilder, RequestManager};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct User {
    ///     id: u64,
    ///     name: String,
    /// }
    ///
    /// # async fn run(manager: Arc<RequestManager>) -> civix::Result<()> {
    /// let user: User = ApiBuilder::new(&manager).get("/users/5").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get<T: DeserializeOwned>(self, endpoint: &str) -> Result<T> {
        self.execute(Method::GET, endpoint).await
    }

    /// Execute a DELETE request
    pub async fn delete<T: DeserializeOwned>(self, endpoint: &str) -> Result<T> {
        self.execute(Method::DELETE, endpoint).await
    }

    /// Execute a GET request and return the shared payload without decoding
    pub async fn fetch(self, endpoint: &str) -> Result<Payload> {
        self.send(Method::GET, endpoint).await
    }
}

// Terminal methods for BodySet (body required)
impl ApiBuilder<BodySet> {
    pub async fn post<T: DeserializeOwned>(self, endpoint: &str) -> Result<T> {
        self.execute(Method::POST, endpoint).await
    }

    pub async fn put<T: DeserializeOwned>(self, endpoint: &str) -> Result<T> {
        self.execute(Method::PUT, endpoint).await
    }

    pub async fn patch<T: DeserializeOwned>(self, endpoint: &str) -> Result<T> {
        self.execute(Method::PATCH, endpoint).await
    }
}

impl<S> ApiBuilder<S> {
    async fn execute<T: DeserializeOwned>(self, method: Method, endpoint: &str) -> Result<T> {
        let payload = self.send(method, endpoint).await?;
        T::deserialize(payload.as_ref())
            .map_err(|e| civix_client::error::decode(e).with_endpoint(endpoint))
    }

    async fn send(mut self, method: Method, endpoint: &str) -> Result<Payload> {
        if let Some(error) = self.error.take() {
            return Err(error.with_endpoint(endpoint));
        }
        self.options.method = method;

        if self.debug_enabled {
            tracing::debug!(
                target: "civix::builder",
                method = %self.options.method,
                endpoint,
                bypass_cache = self.options.bypass_cache,
                "Executing request"
            );
        }

        let result = self.manager.request(endpoint, self.options).await;

        if self.debug_enabled {
            match result {
                Ok(_) => tracing::debug!(target: "civix::builder", endpoint, "Request succeeded"),
                Err(ref e) => tracing::debug!(target: "civix::builder", endpoint, error = %e, "Request failed"),
            }
        }
        result
    }
}
