//! Typed pub/sub for incoming socket events
//!
//! Every handler subscribed to an event's `MessageType` runs. A handler that
//! returns an error or panics is logged and skipped; the remaining handlers
//! and the dispatch loop are unaffected.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::events::{MessageType, ServerEvent};

/// Error type handlers may return
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type HandlerResult = std::result::Result<(), HandlerError>;

type Handler = Arc<dyn Fn(&ServerEvent) -> HandlerResult + Send + Sync>;

/// Handle returned by `EventBus::subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Outcome of one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub invoked: usize,
    /// Handlers that returned an error or panicked
    pub failed: usize,
}

#[derive(Default)]
pub struct EventBus {
    handlers: DashMap<MessageType, Vec<(SubscriptionId, Handler)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("message_types", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, message_type: MessageType, handler: F) -> SubscriptionId
    where
        F: Fn(&ServerEvent) -> HandlerResult + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .entry(message_type)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns false when it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut removed = false;
        for mut entry in self.handlers.iter_mut() {
            let before = entry.len();
            entry.retain(|(handler_id, _)| *handler_id != id);
            removed |= entry.len() != before;
        }
        removed
    }

    #[must_use]
    pub fn handler_count(&self, message_type: MessageType) -> usize {
        self.handlers.get(&message_type).map_or(0, |handlers| handlers.len())
    }

    pub fn clear(&self) {
        self.handlers.clear();
    }

    /// Run every handler registered for the event's type.
    pub fn dispatch(&self, event: &ServerEvent) -> DispatchReport {
        let message_type = event.message_type();
        // Snapshot so handlers may (un)subscribe without deadlocking the shard
        let handlers: Vec<(SubscriptionId, Handler)> = match self.handlers.get(&message_type) {
            Some(handlers) => handlers.value().clone(),
            None => {
                tracing::trace!(
                    target: "civix::messaging",
                    message_type = message_type.as_str(),
                    "No handlers registered"
                );
                return DispatchReport::default();
            }
        };

        let mut report = DispatchReport::default();
        for (id, handler) in handlers {
            report.invoked += 1;
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::warn!(
                        target: "civix::messaging",
                        message_type = message_type.as_str(),
                        subscription = id.0,
                        error = %e,
                        "Event handler failed"
                    );
                }
                Err(panic) => {
                    report.failed += 1;
                    tracing::error!(
                        target: "civix::messaging",
                        message_type = message_type.as_str(),
                        subscription = id.0,
                        panic = panic_message(panic.as_ref()),
                        "Event handler panicked"
                    );
                }
            }
        }
        report
    }

    /// Decode a text frame and dispatch it. Undecodable frames are logged and
    /// dropped.
    pub fn dispatch_frame(&self, frame: &str) -> Option<DispatchReport> {
        match ServerEvent::decode(frame) {
            Ok(event) => Some(self.dispatch(&event)),
            Err(e) => {
                tracing::warn!(
                    target: "civix::messaging",
                    error = %e,
                    frame_len = frame.len(),
                    "Dropping undecodable frame"
                );
                None
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
