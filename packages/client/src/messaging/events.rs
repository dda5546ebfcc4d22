//! Socket event envelopes
//!
//! Every frame is a JSON object `{"messageType": "...", "data": {...}}`.
//! Incoming frames decode into `ServerEvent`, outgoing ones are built from
//! `ClientEvent`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{self, Result};

/// Discriminator of incoming events, used to route subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    NewMessage,
    MessageSent,
    TypingStart,
    TypingStop,
    MessagesMarkedRead,
    NewNotification,
    Error,
}

impl MessageType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewMessage => "new_message",
            Self::MessageSent => "message_sent",
            Self::TypingStart => "typing_start",
            Self::TypingStop => "typing_stop",
            Self::MessagesMarkedRead => "messages_marked_read",
            Self::NewNotification => "new_notification",
            Self::Error => "error",
        }
    }
}

/// Events pushed by the server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "messageType", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A message from another participant
    NewMessage(ChatMessage),
    /// Echo of a message this user sent, with its server-assigned id
    MessageSent(ChatMessage),
    TypingStart(TypingIndicator),
    TypingStop(TypingIndicator),
    MessagesMarkedRead(ReadReceipt),
    NewNotification(Notification),
    Error(ServerError),
}

impl ServerEvent {
    /// Decode one text frame.
    pub fn decode(frame: &str) -> Result<Self> {
        serde_json::from_str(frame).map_err(error::decode)
    }

    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::NewMessage(_) => MessageType::NewMessage,
            Self::MessageSent(_) => MessageType::MessageSent,
            Self::TypingStart(_) => MessageType::TypingStart,
            Self::TypingStop(_) => MessageType::TypingStop,
            Self::MessagesMarkedRead(_) => MessageType::MessagesMarkedRead,
            Self::NewNotification(_) => MessageType::NewNotification,
            Self::Error(_) => MessageType::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub conversation_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingIndicator {
    #[serde(deserialize_with = "string_or_number")]
    pub conversation_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    #[serde(deserialize_with = "string_or_number")]
    pub conversation_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default)]
    pub message_ids: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Notification category, e.g. `civic_action` or `new_follower`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Server-reported failure; the payload is either a bare string or an
/// object with a message and optional code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawServerError")]
pub struct ServerError {
    pub message: String,
    pub code: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawServerError {
    Text(String),
    Detailed {
        message: String,
        #[serde(default)]
        code: Option<String>,
    },
}

impl From<RawServerError> for ServerError {
    fn from(raw: RawServerError) -> Self {
        match raw {
            RawServerError::Text(message) => Self {
                message,
                code: None,
            },
            RawServerError::Detailed { message, code } => Self { message, code },
        }
    }
}

/// Events this client emits
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "messageType", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    SendMessage {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        content: String,
    },
    TypingStart {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    TypingStop {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    MarkRead {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "messageIds")]
        message_ids: Vec<String>,
    },
}

impl ClientEvent {
    /// Serialize into a text frame.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(error::builder)
    }
}

/// Ids arrive as strings from some endpoints and integers from others.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
