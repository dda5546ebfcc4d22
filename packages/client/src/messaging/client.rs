//! Messaging client state machine
//!
//! ```text
//! Disconnected --connect()--> Connecting --ack--> Connected
//!      ^                          |                   |
//!      +------ error (retry) -----+------- error -----+
//!      |
//!      +-- budget spent --> Disabled (terminal)
//! ```
//!
//! A server-initiated close leaves the client `Disconnected` without
//! reconnecting. All connection work happens on one spawned driver task.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use url::Url;

use super::bus::{EventBus, HandlerResult, SubscriptionId};
use super::connector::{SocketConnector, SocketEvent, TungsteniteConnector};
use super::events::{ClientEvent, MessageType, ServerEvent};
use super::state::ConnectionState;
use crate::config::{ClientConfig, MessagingConfig};
use crate::error::{self, Result};
use crate::session::SessionStore;

type StateListener = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// WebSocket client with reconnect backoff and typed event dispatch.
///
/// Dropping the client stops its driver task.
pub struct MessagingClient {
    shared: Arc<Shared>,
}

struct Shared {
    config: MessagingConfig,
    url: Url,
    session: Arc<SessionStore>,
    connector: Arc<dyn SocketConnector>,
    bus: EventBus,
    state: watch::Sender<ConnectionState>,
    /// Consecutive failed connection attempts
    attempts: AtomicU32,
    listeners: Mutex<Vec<(u64, StateListener)>>,
    next_listener: AtomicU64,
    /// Bumped by `connect`/`disconnect`; a driver from an older generation
    /// can no longer change state
    generation: AtomicU64,
    outgoing: Mutex<Option<mpsc::Sender<String>>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    /// Runtime the client was built on, if any
    runtime: Option<Handle>,
}

impl std::fmt::Debug for MessagingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingClient")
            .field("url", &self.shared.url.as_str())
            .field("state", &self.state())
            .field("attempts", &self.reconnect_attempts())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MessagingClient {
    /// Client for the configured socket URL over an explicit connector.
    ///
    /// When built inside a tokio runtime, the driver task is spawned on that
    /// runtime, so `connect` may later be called from any thread.
    pub fn new(
        config: &ClientConfig,
        session: Arc<SessionStore>,
        connector: Arc<dyn SocketConnector>,
    ) -> Result<Self> {
        config.messaging.validate().map_err(error::builder)?;
        let url = config.socket_url().map_err(error::builder)?;
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            shared: Arc::new(Shared {
                config: config.messaging.clone(),
                url,
                session,
                connector,
                bus: EventBus::new(),
                state,
                attempts: AtomicU32::new(0),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                outgoing: Mutex::new(None),
                driver: Mutex::new(None),
                runtime: Handle::try_current().ok(),
            }),
        })
    }

    /// Client over tokio-tungstenite.
    pub fn websocket(config: &ClientConfig, session: Arc<SessionStore>) -> Result<Self> {
        let connector = TungsteniteConnector::new(config.messaging.outgoing_buffer);
        Self::new(config, session, Arc::new(connector))
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver that observes every state change
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Register a callback run on every state change. Panics inside the
    /// callback are contained.
    pub fn on_state_change<F>(&self, listener: F) -> u64
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        let id = self.shared.next_listener.fetch_add(1, Ordering::Relaxed);
        lock(&self.shared.listeners).push((id, Arc::new(listener)));
        id
    }

    pub fn remove_state_listener(&self, id: u64) -> bool {
        let mut listeners = lock(&self.shared.listeners);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.shared.bus
    }

    /// Subscribe to one incoming event type.
    pub fn on<F>(&self, message_type: MessageType, handler: F) -> SubscriptionId
    where
        F: Fn(&ServerEvent) -> HandlerResult + Send + Sync + 'static,
    {
        self.shared.bus.subscribe(message_type, handler)
    }

    /// Consecutive failed connection attempts since the last success
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    /// Start connecting in the background.
    ///
    /// Without an authenticated session this does nothing. While connecting
    /// or connected it is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a `Disabled` error once the reconnect budget has been spent,
    /// and a builder error when the client was built outside a tokio runtime
    /// and `connect` is called outside one too.
    pub fn connect(&self) -> Result<()> {
        let runtime = match self.shared.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => runtime,
            None => return Err(error::builder("connect requires a tokio runtime")),
        };

        let generation = {
            let mut driver = lock(&self.shared.driver);

            match self.state() {
                ConnectionState::Disabled => return Err(error::disabled()),
                ConnectionState::Connecting | ConnectionState::Connected => return Ok(()),
                ConnectionState::Disconnected => {}
            }

            if self.shared.session.authenticated().is_none() {
                tracing::debug!(target: "civix::messaging", "No session, not connecting");
                return Ok(());
            }

            if let Some(handle) = driver.take() {
                handle.abort();
            }
            let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.shared.transition(ConnectionState::Connecting, None) {
                return Ok(());
            }
            generation
        };

        // Listeners run without the driver lock so they may call back in
        self.shared.notify(ConnectionState::Connecting);

        let mut driver = lock(&self.shared.driver);
        if self.shared.is_current(generation) && driver.is_none() {
            *driver = Some(runtime.spawn(Arc::clone(&self.shared).drive(generation)));
        }
        Ok(())
    }

    /// Close the connection and cancel any scheduled reconnect. A disabled
    /// client stays disabled.
    pub fn disconnect(&self) {
        {
            let mut driver = lock(&self.shared.driver);
            let mut outgoing = lock(&self.shared.outgoing);
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            if let Some(handle) = driver.take() {
                handle.abort();
            }
            outgoing.take();
        }
        self.shared.attempts.store(0, Ordering::SeqCst);
        self.shared.set_state(ConnectionState::Disconnected, None);
    }

    pub fn send_message(&self, conversation_id: &str, content: &str) -> Result<()> {
        self.emit(&ClientEvent::SendMessage {
            conversation_id: conversation_id.to_string(),
            content: content.to_string(),
        })
    }

    pub fn start_typing(&self, conversation_id: &str) -> Result<()> {
        self.emit(&ClientEvent::TypingStart {
            conversation_id: conversation_id.to_string(),
        })
    }

    pub fn stop_typing(&self, conversation_id: &str) -> Result<()> {
        self.emit(&ClientEvent::TypingStop {
            conversation_id: conversation_id.to_string(),
        })
    }

    pub fn mark_read(&self, conversation_id: &str, message_ids: &[String]) -> Result<()> {
        self.emit(&ClientEvent::MarkRead {
            conversation_id: conversation_id.to_string(),
            message_ids: message_ids.to_vec(),
        })
    }

    /// Queue an event for sending.
    ///
    /// # Errors
    ///
    /// `NotConnected` unless the socket is connected; a socket error when
    /// the outgoing queue is full.
    pub fn emit(&self, event: &ClientEvent) -> Result<()> {
        if !self.state().is_connected() {
            return Err(error::not_connected());
        }
        let Some(sender) = lock(&self.shared.outgoing).clone() else {
            return Err(error::not_connected());
        };

        let frame = event.encode()?;
        sender.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => error::socket("outgoing queue is full"),
            mpsc::error::TrySendError::Closed(_) => error::not_connected(),
        })
    }
}

impl Drop for MessagingClient {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.shared.driver).take() {
            handle.abort();
        }
    }
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Publish a state change. Leaving `Disabled` is refused, as is any
    /// change from a driver of an older generation.
    fn set_state(&self, next: ConnectionState, generation: Option<u64>) {
        if self.transition(next, generation) {
            self.notify(next);
        }
    }

    /// Update the watch channel only. Returns whether the state changed.
    fn transition(&self, next: ConnectionState, generation: Option<u64>) -> bool {
        let mut previous = next;
        let changed = self.state.send_if_modified(|current| {
            if *current == next || current.is_disabled() {
                return false;
            }
            if generation.is_some_and(|generation| !self.is_current(generation)) {
                return false;
            }
            previous = *current;
            *current = next;
            true
        });

        if changed {
            tracing::debug!(
                target: "civix::messaging",
                from = previous.as_str(),
                to = next.as_str(),
                "Connection state changed"
            );
        }
        changed
    }

    /// Run the registered callbacks. No client lock is held here.
    fn notify(&self, next: ConnectionState) {
        let listeners: Vec<StateListener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(next))).is_err() {
                tracing::error!(target: "civix::messaging", "State listener panicked");
            }
        }
    }

    /// Connect, pump, reconnect with backoff; exits on server close,
    /// session loss or an exhausted budget.
    async fn drive(self: Arc<Self>, generation: u64) {
        let state = |next| self.set_state(next, Some(generation));
        let mut delay: Option<Duration> = None;

        loop {
            if let Some(delay) = delay.take() {
                tokio::time::sleep(delay).await;
            }

            let Some(session) = self.session.authenticated() else {
                tracing::debug!(target: "civix::messaging", "Session gone, stopping");
                state(ConnectionState::Disconnected);
                return;
            };

            state(ConnectionState::Connecting);
            match self.connector.connect(self.url.clone(), &session).await {
                Ok(channel) => {
                    {
                        let mut outgoing = lock(&self.outgoing);
                        if !self.is_current(generation) {
                            return;
                        }
                        *outgoing = Some(channel.outgoing);
                    }
                    self.attempts.store(0, Ordering::SeqCst);
                    state(ConnectionState::Connected);
                    tracing::info!(target: "civix::messaging", url = %self.url, "Messaging connected");

                    let by_server = self.pump(channel.incoming).await;

                    {
                        let mut outgoing = lock(&self.outgoing);
                        if self.is_current(generation) {
                            outgoing.take();
                        }
                    }
                    state(ConnectionState::Disconnected);
                    if by_server {
                        tracing::info!(
                            target: "civix::messaging",
                            "Server closed the connection, not reconnecting"
                        );
                        return;
                    }
                    delay = Some(self.config.reconnect_delay(0));
                }
                Err(e) => {
                    state(ConnectionState::Disconnected);
                    let failures = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

                    if failures >= self.config.max_reconnect_attempts {
                        tracing::warn!(
                            target: "civix::messaging",
                            attempts = failures,
                            error = %e,
                            "Reconnect budget exhausted, disabling messaging"
                        );
                        state(ConnectionState::Disabled);
                        return;
                    }

                    let next = self.config.reconnect_delay(failures - 1);
                    tracing::warn!(
                        target: "civix::messaging",
                        attempt = failures,
                        max_attempts = self.config.max_reconnect_attempts,
                        delay_ms = u64::try_from(next.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Connection failed, retrying"
                    );
                    delay = Some(next);
                }
            }
        }
    }

    /// Dispatch frames until the connection ends. Returns true for a
    /// server-initiated close.
    async fn pump(&self, mut incoming: mpsc::Receiver<SocketEvent>) -> bool {
        while let Some(event) = incoming.recv().await {
            match event {
                SocketEvent::Frame(frame) => {
                    self.bus.dispatch_frame(&frame);
                }
                SocketEvent::Closed { by_server } => return by_server,
                SocketEvent::Error(e) => {
                    tracing::warn!(target: "civix::messaging", error = %e, "Socket error");
                    return false;
                }
            }
        }
        false
    }
}
