//! Socket seam for the messaging client
//!
//! A `SocketConnector` opens one authenticated connection and hands back a
//! pair of channels: text frames to send, and frames and lifecycle events
//! received. The client never sees the socket itself.

use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use http::HeaderValue;
use http::header::COOKIE;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{self, Error, Result};
use crate::session::Session;

/// What the socket reports to the client
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// One text frame
    Frame(String),
    /// The connection ended. `by_server` is true for a server-initiated
    /// close, which the client treats as final.
    Closed { by_server: bool },
    /// Transport failure; the connection is gone
    Error(Error),
}

/// Channels for one open connection
#[derive(Debug)]
pub struct SocketChannel {
    pub outgoing: mpsc::Sender<String>,
    pub incoming: mpsc::Receiver<SocketEvent>,
}

/// Opens authenticated socket connections.
pub trait SocketConnector: Send + Sync {
    /// Resolves once the server accepted the connection.
    fn connect(&self, url: Url, session: &Session) -> BoxFuture<'static, Result<SocketChannel>>;
}

/// Socket URL carrying the legacy `token` query parameter when the session
/// has a bearer token but no cookie.
#[must_use]
pub fn authenticated_url(mut url: Url, session: &Session) -> Url {
    if session.cookie.is_none() {
        if let Some(ref token) = session.token {
            url.query_pairs_mut().append_pair("token", token);
        }
    }
    url
}

/// `SocketConnector` over tokio-tungstenite with rustls.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    buffer: usize,
}

impl TungsteniteConnector {
    /// `buffer` bounds both frame queues.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
        }
    }
}

impl Default for TungsteniteConnector {
    fn default() -> Self {
        Self::new(64)
    }
}

impl SocketConnector for TungsteniteConnector {
    fn connect(&self, url: Url, session: &Session) -> BoxFuture<'static, Result<SocketChannel>> {
        let url = authenticated_url(url, session);
        let cookie = session.cookie.clone();
        let buffer = self.buffer;

        Box::pin(async move {
            let mut request = url.as_str().into_client_request().map_err(error::socket)?;
            if let Some(cookie) = cookie {
                let value = HeaderValue::from_str(&cookie).map_err(error::builder)?;
                request.headers_mut().insert(COOKIE, value);
            }

            let (ws, _) = tokio_tungstenite::connect_async(request)
                .await
                .map_err(error::socket)?;

            tracing::debug!(target: "civix::messaging", host = ?url.host_str(), "Socket opened");

            let (outgoing_tx, outgoing_rx) = mpsc::channel(buffer);
            let (incoming_tx, incoming_rx) = mpsc::channel(buffer);
            tokio::spawn(pump(ws, outgoing_rx, incoming_tx));

            Ok(SocketChannel {
                outgoing: outgoing_tx,
                incoming: incoming_rx,
            })
        })
    }
}

/// Shuttle frames between the socket and the client's channels until either
/// side goes away.
async fn pump(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut outgoing: mpsc::Receiver<String>,
    incoming: mpsc::Sender<SocketEvent>,
) {
    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            frame = outgoing.recv() => match frame {
                Some(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        incoming.send(SocketEvent::Error(error::socket(e))).await.ok();
                        break;
                    }
                }
                None => {
                    // Client hung up
                    write.send(Message::Close(None)).await.ok();
                    break;
                }
            },
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    tracing::trace!(target: "civix::messaging", len = text.len(), "Frame received");
                    if incoming.send(SocketEvent::Frame(text)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(target: "civix::messaging", frame = ?frame, "Server closed socket");
                    incoming.send(SocketEvent::Closed { by_server: true }).await.ok();
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    incoming.send(SocketEvent::Error(error::socket(e))).await.ok();
                    break;
                }
                None => {
                    incoming.send(SocketEvent::Closed { by_server: false }).await.ok();
                    break;
                }
            },
        }
    }
}
