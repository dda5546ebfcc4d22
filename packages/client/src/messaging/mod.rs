//! Real-time messaging over a single WebSocket
//!
//! `MessagingClient` owns the connection state machine and reconnect backoff,
//! `EventBus` fans decoded `ServerEvent`s out to subscribers, and a
//! `SocketConnector` provides the actual socket.

pub mod bus;
pub mod client;
pub mod connector;
pub mod events;
pub mod state;

pub use bus::{DispatchReport, EventBus, HandlerError, HandlerResult, SubscriptionId};
pub use client::MessagingClient;
pub use connector::{SocketChannel, SocketConnector, SocketEvent, TungsteniteConnector};
pub use events::{
    ChatMessage, ClientEvent, MessageType, Notification, ReadReceipt, ServerError, ServerEvent,
    TypingIndicator,
};
pub use state::ConnectionState;
