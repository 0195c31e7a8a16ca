//! Message DTOs for send and history endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ChatMessage;

/// Request body for `POST /messages`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// Session of the sender.
    pub session_id: uuid::Uuid,
    /// Message text. Must not be blank.
    pub body: String,
}

/// A message as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageDto {
    /// Position in the room's log, starting at 1.
    pub seq: u64,
    /// Sender identifier.
    pub sender: String,
    /// Message text.
    pub body: String,
    /// Server timestamp (second resolution).
    pub timestamp: DateTime<Utc>,
    /// Timestamp rendered as `HH:MM:SS` in server local time.
    pub time: String,
}

impl From<ChatMessage> for MessageDto {
    fn from(message: ChatMessage) -> Self {
        Self {
            time: message.display_time(),
            seq: message.seq,
            sender: message.sender.into(),
            body: message.body,
            timestamp: message.timestamp,
        }
    }
}

/// Response body for `GET /messages`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageListResponse {
    /// Every message in arrival order.
    pub messages: Vec<MessageDto>,
    /// Number of messages.
    pub count: usize,
}

impl From<Vec<ChatMessage>> for MessageListResponse {
    fn from(messages: Vec<ChatMessage>) -> Self {
        let messages: Vec<MessageDto> = messages.into_iter().map(MessageDto::from).collect();
        Self {
            count: messages.len(),
            messages,
        }
    }
}
