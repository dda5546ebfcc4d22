//! Network seam for the request manager
//!
//! A `Transport` performs exactly one HTTP exchange per call; retries, caching
//! and deduplication all live above it.

pub mod hyper_transport;

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};

pub use hyper_transport::HyperTransport;

/// One HTTP exchange. Non-success statuses are returned as responses, not
/// errors; only failures that produced no response are `Err`.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse>> {
        (**self).send(request)
    }
}
