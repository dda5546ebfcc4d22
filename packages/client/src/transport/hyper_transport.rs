//! HTTP transport over hyper with rustls

use std::time::Duration;

use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use super::Transport;
use crate::error::{self, Result};
use crate::http::{HttpRequest, HttpResponse};

/// Pooled HTTP/1.1 + HTTP/2 client over rustls with webpki roots
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    timeout: Duration,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Build a transport whose attempts time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let provider = rustls::crypto::ring::default_provider();
        let https = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(provider)
            .map_err(error::builder)?
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(https);

        Ok(Self { client, timeout })
    }

    async fn exchange(
        client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
        request: HttpRequest,
    ) -> Result<HttpResponse> {
        let mut builder = http::Request::builder()
            .method(request.method.clone())
            .uri(request.url.as_str());

        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers);
        }

        let outgoing = builder
            .body(Full::new(request.body.unwrap_or_default()))
            .map_err(error::builder)?;

        let response = client.request(outgoing).await.map_err(error::request)?;
        let (parts, body) = response.into_parts();
        let body = body.collect().await.map_err(error::request)?.to_bytes();

        Ok(HttpResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse>> {
        let client = self.client.clone();
        let timeout = self.timeout;
        let url = request.url.clone();

        async move {
            tracing::trace!(target: "civix::transport", method = %request.method, %url, "Sending request");
            match tokio::time::timeout(timeout, Self::exchange(client, request)).await {
                Ok(result) => result,
                Err(_) => Err(error::timeout(timeout)),
            }
        }
        .boxed()
    }
}
