//! Domain events reflecting room state changes.
//!
//! Every presence change and every accepted message emits a [`ChatEvent`]
//! through the [`super::EventBus`]. Events are pushed to WebSocket
//! subscribers as they happen.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ChatMessage, UserId};

/// Why a user left the connected set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveReason {
    /// The client asked to leave.
    Requested,
    /// The client's connection closed.
    Disconnected,
    /// The session stopped sending heartbeats.
    TimedOut,
}

/// Domain event emitted after every room mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Emitted when an identifier joins the connected set.
    UserJoined {
        /// Identifier that joined.
        user_id: UserId,
        /// Join timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when an identifier leaves the connected set.
    UserLeft {
        /// Identifier that left.
        user_id: UserId,
        /// Why it left.
        reason: LeaveReason,
        /// Leave timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted after a message is appended to the log.
    MessagePosted {
        /// The accepted message.
        message: ChatMessage,
    },
}

impl ChatEvent {
    /// Returns the identifier this event concerns.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        match self {
            Self::UserJoined { user_id, .. } | Self::UserLeft { user_id, .. } => user_id,
            Self::MessagePosted { message } => &message.sender,
        }
    }

    /// Returns the log sequence number for message events.
    #[must_use]
    pub fn seq(&self) -> Option<u64> {
        match self {
            Self::MessagePosted { message } => Some(message.seq),
            Self::UserJoined { .. } | Self::UserLeft { .. } => None,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::UserJoined { .. } => "user_joined",
            Self::UserLeft { .. } => "user_left",
            Self::MessagePosted { .. } => "message_posted",
        }
    }
}
