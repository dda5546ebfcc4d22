//! Civix public API
//!
//! One `Civix` value per signed-in user: a `RequestManager` for the REST API
//! and a `MessagingClient` for the real-time socket, sharing one session.
//!
//! ```no_run
//! use civix::{Civix, ClientConfig, Session};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Post {
//!     id: u64,
//!     title: String,
//! }
//!
//! # async fn run() -> civix::Result<()> {
//! let civix = Civix::new(ClientConfig::default())?;
//! civix.sign_in(Session::with_token("token"));
//!
//! let feed: Vec<Post> = civix.api().get("/feed").await?;
//! let created: Post = civix
//!     .api()
//!     .body(&serde_json::json!({"title": "Town hall on Thursday"}))
//!     .post("/posts")
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod builder;

use std::sync::Arc;

pub use builder::*;

// Re-export important types from client package
pub use civix_client::prelude::*;
pub use civix_client::{Error, Result, messaging, testing};

/// Request manager and messaging client sharing one session
#[derive(Debug, Clone)]
pub struct Civix {
    session: Arc<SessionStore>,
    manager: Arc<RequestManager>,
    messaging: Arc<MessagingClient>,
}

impl Civix {
    /// Build both clients over the network transports.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or no base URL can be
    /// resolved.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let session = Arc::new(SessionStore::new());
        let messaging = MessagingClient::websocket(&config, Arc::clone(&session))?;
        let manager = RequestManager::http(config, Arc::clone(&session))?;
        Ok(Self::from_parts(session, manager, messaging))
    }

    /// Assemble from already built parts, e.g. over test transports.
    #[must_use]
    pub fn from_parts(
        session: Arc<SessionStore>,
        manager: RequestManager,
        messaging: MessagingClient,
    ) -> Self {
        Self {
            session,
            manager: Arc::new(manager),
            messaging: Arc::new(messaging),
        }
    }

    /// Start a request
    #[must_use]
    pub fn api(&self) -> ApiBuilder {
        ApiBuilder::new(&self.manager)
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<RequestManager> {
        &self.manager
    }

    #[must_use]
    pub fn messaging(&self) -> &Arc<MessagingClient> {
        &self.messaging
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Store the session and bring the messaging socket up.
    ///
    /// Callable from any thread when `Civix` was built inside a tokio
    /// runtime. Otherwise the socket stays down and a warning is logged.
    pub fn sign_in(&self, session: Session) {
        self.session.set(session);
        if let Err(e) = self.messaging.connect() {
            tracing::warn!(target: "civix::messaging", error = %e, "Messaging unavailable, poll instead");
        }
    }

    /// Drop the session, close the socket and forget cached responses.
    pub fn sign_out(&self) {
        self.messaging.disconnect();
        self.session.clear();
        self.manager.clear_cache();
    }
}
