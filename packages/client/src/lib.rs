//! # Civix API client
//!
//! Request plumbing for the Civix civic-engagement app: one `RequestManager`
//! that caches, deduplicates and retries JSON API calls, and one
//! `MessagingClient` that keeps the real-time messaging socket alive.
//!
//! ## Features
//!
//! - **Response caching** keyed by endpoint, method and body digest, with a
//!   per-request TTL
//! - **In-flight deduplication**: identical concurrent requests share one
//!   network call and one result
//! - **Retries** with exponential backoff, `Retry-After` support for 429 and
//!   no retries for client errors
//! - **Batches** with per-entry success or failure
//! - **Messaging socket** with reconnect backoff, a terminal `Disabled` state
//!   and typed, fault-isolated event handlers
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use civix_client::prelude::*;
//!
//! # async fn run() -> civix_client::Result<()> {
//! let session = Arc::new(SessionStore::with_session(Session::with_token("token")));
//! let manager = RequestManager::http(ClientConfig::default(), Arc::clone(&session))?;
//!
//! let feed = manager
//!     .request("/feed", RequestOptions::get().cache_timeout(std::time::Duration::from_secs(5)))
//!     .await?;
//! println!("{feed}");
//!
//! let messaging = MessagingClient::websocket(manager.config(), session)?;
//! messaging.on(MessageType::NewMessage, |event| {
//!     println!("{event:?}");
//!     Ok(())
//! });
//! messaging.connect()?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod manager;
pub mod messaging;
pub mod retry;
pub mod session;
pub mod telemetry;
pub mod testing;
pub mod transport;

pub mod prelude;

pub use crate::error::{Error, Result};
pub use crate::prelude::*;
