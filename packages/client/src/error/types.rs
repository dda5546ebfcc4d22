use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;

/// A Result alias where the Err case is `civix_client::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors that can occur issuing API requests or driving the
/// messaging socket.
///
/// The inner state is reference counted so a single failure can be handed to
/// every caller that shared a deduplicated request.
#[derive(Clone)]
pub struct Error {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) kind: Kind,
    pub(crate) source: Option<Box<dyn StdError + Send + Sync>>,
    pub(crate) endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    /// Invalid URL, header or configuration
    Builder,
    /// Network-level failure, no HTTP status was received
    Request,
    /// Per-attempt transport timeout
    Timeout,
    /// Non-success HTTP status
    Status {
        status: StatusCode,
        retry_after: Option<Duration>,
    },
    /// Response body could not be decoded
    Decode,
    /// WebSocket transport failure
    Socket,
    /// Outgoing socket event while not connected
    NotConnected,
    /// Messaging client exceeded its reconnect budget
    Disabled,
}

impl Error {
    pub fn new(kind: Kind) -> Error {
        Error {
            inner: Arc::new(Inner {
                kind,
                source: None,
                endpoint: None,
            }),
        }
    }

    #[must_use = "Error builder methods return a new Error and should be used"]
    pub fn with<E: Into<Box<dyn StdError + Send + Sync>>>(self, source: E) -> Error {
        self.map_inner(|inner| inner.source = Some(source.into()))
    }

    #[must_use]
    pub fn with_endpoint(self, endpoint: impl Into<String>) -> Error {
        let endpoint = endpoint.into();
        self.map_inner(|inner| inner.endpoint = Some(endpoint))
    }

    // Only called while building a fresh error, before it is shared.
    fn map_inner(self, f: impl FnOnce(&mut Inner)) -> Error {
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                f(&mut inner);
                Error {
                    inner: Arc::new(inner),
                }
            }
            Err(shared) => {
                let mut inner = Inner {
                    kind: shared.kind.clone(),
                    source: None,
                    endpoint: shared.endpoint.clone(),
                };
                f(&mut inner);
                Error {
                    inner: Arc::new(inner),
                }
            }
        }
    }

    /// The error classification
    #[must_use]
    pub fn kind(&self) -> &Kind {
        &self.inner.kind
    }

    /// The endpoint the failing request targeted, if known
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.inner.endpoint.as_deref()
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("civix_client::Error");

        f.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }

        if let Some(ref endpoint) = self.inner.endpoint {
            f.field("endpoint", endpoint);
        }

        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.kind {
            Kind::Builder => f.write_str("builder error")?,
            Kind::Request => f.write_str("error sending request")?,
            Kind::Timeout => f.write_str("request timeout")?,
            Kind::Decode => f.write_str("error decoding response body")?,
            Kind::Socket => f.write_str("websocket error")?,
            Kind::NotConnected => f.write_str("messaging socket is not connected")?,
            Kind::Disabled => f.write_str("messaging disabled after exhausting reconnect attempts")?,
            Kind::Status { status, .. } => {
                let prefix = if status.is_client_error() {
                    "HTTP status client error"
                } else if status.is_server_error() {
                    "HTTP status server error"
                } else {
                    "HTTP status error"
                };
                write!(f, "{prefix} ({status})")?;
            }
        }

        if let Some(ref endpoint) = self.inner.endpoint {
            write!(f, " for {endpoint}")?;
        }

        if let Some(ref source) = self.inner.source {
            write!(f, ": {source}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}
