//! Civix client prelude
//!
//! The types most callers need, in one import.

pub use crate::cache::{CacheConfig, CacheStatsSnapshot, Payload};
pub use crate::config::{ClientConfig, Environment, EnvironmentConfig, MessagingConfig, RequestOptions};
pub use crate::error::{Error, Kind, Result};
pub use crate::manager::{BatchRequest, BatchResponse, RequestManager};
pub use crate::messaging::{
    ClientEvent, ConnectionState, EventBus, HandlerResult, MessageType, MessagingClient, ServerEvent,
};
pub use crate::retry::RetryPolicy;
pub use crate::session::{Session, SessionStore};
pub use crate::transport::{HyperTransport, Transport};

// HTTP standard types from http crate
pub use ::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

pub use url::Url;
