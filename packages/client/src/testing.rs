//! In-memory transport and socket connector for tests
//!
//! `MockTransport` answers requests from scripted replies and records what it
//! was sent. `MockConnector` fails or accepts socket connections on script and
//! hands the test a `MockSocket` for every accepted one.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use http::{Method, StatusCode};
use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;

use crate::error::{self, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::messaging::{SocketChannel, SocketConnector, SocketEvent};
use crate::session::Session;
use crate::transport::Transport;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One scripted outcome
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(HttpResponse),
    /// Fail without a response, like a refused connection
    NetworkError(String),
}

impl MockReply {
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::Response(HttpResponse::json(status, &body))
    }

    /// Response with extra headers, e.g. `Retry-After`
    #[must_use]
    pub fn with_header(self, name: &'static str, value: &str) -> Self {
        match self {
            Self::Response(mut response) => {
                if let Ok(value) = http::HeaderValue::from_str(value) {
                    response.headers.insert(name, value);
                }
                Self::Response(response)
            }
            other => other,
        }
    }
}

/// Scripted `Transport`.
///
/// Replies are queued per method and path. The last reply for a route is
/// repeated once the queue is down to one; unscripted routes answer 404.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<MockReply>>>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Option<Duration>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply, so concurrent callers overlap.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a reply for `method path`.
    pub fn reply(&self, method: Method, path: &str, reply: MockReply) -> &Self {
        lock(&self.routes)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Queue a JSON reply for `GET path`.
    pub fn get(&self, path: &str, status: u16, body: Value) -> &Self {
        self.reply(Method::GET, path, MockReply::json(status, body))
    }

    /// Every request sent so far
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Requests whose URL path equals `path`
    #[must_use]
    pub fn calls_to(&self, path: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|request| request.url.path() == path)
            .count()
    }

    fn next_reply(&self, method: &Method, path: &str) -> Option<MockReply> {
        let mut routes = lock(&self.routes);
        let queue = routes.get_mut(&(method.clone(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Transport for MockTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse>> {
        let reply = self.next_reply(&request.method, request.url.path());
        let latency = self.latency;
        lock(&self.requests).push(request);

        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            match reply {
                Some(MockReply::Response(response)) => Ok(response),
                Some(MockReply::NetworkError(message)) => Err(error::request(message)),
                None => Ok(HttpResponse::json(
                    StatusCode::NOT_FOUND,
                    &serde_json::json!({"error": "no mock route"}),
                )),
            }
        })
    }
}

/// Scripted outcome of one connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockConnect {
    Accept,
    Fail,
}

/// Scripted `SocketConnector`.
///
/// Attempts consume the script in order; once it is empty every attempt gets
/// the fallback outcome.
#[derive(Debug)]
pub struct MockConnector {
    script: Mutex<VecDeque<MockConnect>>,
    fallback: MockConnect,
    attempts: AtomicU32,
    connections: Mutex<Vec<(Url, Session)>>,
    sockets: Mutex<VecDeque<MockSocket>>,
}

impl MockConnector {
    /// Every attempt fails.
    #[must_use]
    pub fn failing() -> Self {
        Self::scripted([], MockConnect::Fail)
    }

    /// Every attempt succeeds.
    #[must_use]
    pub fn accepting() -> Self {
        Self::scripted([], MockConnect::Accept)
    }

    #[must_use]
    pub fn scripted(script: impl IntoIterator<Item = MockConnect>, fallback: MockConnect) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            attempts: AtomicU32::new(0),
            connections: Mutex::new(Vec::new()),
            sockets: Mutex::new(VecDeque::new()),
        }
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// URL and session of every attempt
    #[must_use]
    pub fn connections(&self) -> Vec<(Url, Session)> {
        lock(&self.connections).clone()
    }

    /// Server side of the oldest accepted connection not yet taken
    pub fn take_socket(&self) -> Option<MockSocket> {
        lock(&self.sockets).pop_front()
    }
}

impl SocketConnector for MockConnector {
    fn connect(&self, url: Url, session: &Session) -> BoxFuture<'static, Result<SocketChannel>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        lock(&self.connections).push((url, session.clone()));
        let outcome = lock(&self.script).pop_front().unwrap_or(self.fallback);

        let result = match outcome {
            MockConnect::Fail => Err(error::socket("connection refused")),
            MockConnect::Accept => {
                let (outgoing_tx, outgoing_rx) = mpsc::channel(16);
                let (incoming_tx, incoming_rx) = mpsc::channel(16);
                lock(&self.sockets).push_back(MockSocket {
                    events: incoming_tx,
                    sent: outgoing_rx,
                });
                Ok(SocketChannel {
                    outgoing: outgoing_tx,
                    incoming: incoming_rx,
                })
            }
        };

        Box::pin(async move { result })
    }
}

/// Server end of a mock connection
#[derive(Debug)]
pub struct MockSocket {
    events: mpsc::Sender<SocketEvent>,
    sent: mpsc::Receiver<String>,
}

impl MockSocket {
    /// Push a raw text frame to the client.
    pub async fn push_frame(&self, frame: impl Into<String>) {
        self.events.send(SocketEvent::Frame(frame.into())).await.ok();
    }

    /// Push a `{"messageType", "data"}` envelope.
    pub async fn push_event(&self, message_type: &str, data: Value) {
        let frame = serde_json::json!({ "messageType": message_type, "data": data });
        self.push_frame(frame.to_string()).await;
    }

    /// Server-initiated close
    pub async fn close(&self) {
        self.events.send(SocketEvent::Closed { by_server: true }).await.ok();
    }

    /// Transport failure
    pub async fn fail(&self, message: &str) {
        self.events
            .send(SocketEvent::Error(error::socket(message.to_string())))
            .await
            .ok();
    }

    /// Next frame the client sent, decoded as JSON
    pub async fn next_sent(&mut self) -> Option<Value> {
        let frame = self.sent.recv().await?;
        serde_json::from_str(&frame).ok()
    }
}
