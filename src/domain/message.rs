//! Immutable chat message record.

use chrono::{DateTime, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Display format for message timestamps (`HH:MM:SS`).
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// A message accepted into the room's log.
///
/// Created once at send time and never mutated. `seq` is the 1-based
/// position in the log and defines the single total order every
/// subscriber observes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Position in the message log, starting at 1.
    pub seq: u64,
    /// Identifier of the sender.
    pub sender: UserId,
    /// Message text as submitted.
    pub body: String,
    /// Server-assigned timestamp with second resolution.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Creates a message, truncating `timestamp` to whole seconds.
    #[must_use]
    pub fn new(seq: u64, sender: UserId, body: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            seq,
            sender,
            body,
            timestamp: truncate_to_seconds(timestamp),
        }
    }

    /// Returns the timestamp rendered as `HH:MM:SS` in the server's local
    /// time zone. The stored timestamp stays UTC.
    #[must_use]
    pub fn display_time(&self) -> String {
        self.timestamp.with_timezone(&Local).format(TIME_FORMAT).to_string()
    }
}

fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}
