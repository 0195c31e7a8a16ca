//! Per-connection delivery cursor.
//!
//! Tracks the highest message sequence number pushed to one WebSocket
//! client so that messages replayed after a lag are not delivered twice
//! and nothing older than the subscription point is pushed.

/// Highest sequence number delivered to a single connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryCursor {
    last_seq: u64,
}

impl DeliveryCursor {
    /// Creates a cursor positioned after `last_seq`.
    #[must_use]
    pub const fn starting_after(last_seq: u64) -> Self {
        Self { last_seq }
    }

    /// Returns the highest delivered sequence number.
    #[must_use]
    pub const fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Admits `seq` for delivery if it is newer than anything delivered so
    /// far, advancing the cursor. Returns `false` for duplicates.
    pub fn admit(&mut self, seq: u64) -> bool {
        if seq <= self.last_seq {
            return false;
        }
        self.last_seq = seq;
        true
    }
}
