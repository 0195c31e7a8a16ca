//! Database row models.

use chrono::{DateTime, Utc};

use crate::domain::{ChatMessage, UserId};
use crate::error::ChatError;

/// A stored row from the `messages` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredMessage {
    /// Log sequence number (primary key).
    pub seq: i64,
    /// Sender identifier.
    pub user: String,
    /// Message body.
    pub text: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

impl From<&ChatMessage> for StoredMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            seq: i64::try_from(message.seq).unwrap_or(i64::MAX),
            user: message.sender.to_string(),
            text: message.body.clone(),
            timestamp: message.timestamp.to_rfc3339(),
        }
    }
}

impl TryFrom<StoredMessage> for ChatMessage {
    type Error = ChatError;

    fn try_from(row: StoredMessage) -> Result<Self, Self::Error> {
        let seq = u64::try_from(row.seq).map_err(|_| {
            ChatError::StorageUnavailable(format!("negative sequence number {}", row.seq))
        })?;
        let sender = UserId::parse(&row.user)?;
        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| {
                ChatError::StorageUnavailable(format!("bad timestamp {:?}: {e}", row.timestamp))
            })?
            .with_timezone(&Utc);
        Ok(Self::new(seq, sender, row.text, timestamp))
    }
}
