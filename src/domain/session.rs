//! Session handles returned by a successful join.
//!
//! A [`Session`] is the capability a client holds for its connected
//! lifetime. Subsequent sends, heartbeats, and the final leave are all
//! addressed by its [`SessionId`] rather than by re-deriving the user.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Unique token for one connected session.
///
/// Wraps a UUID v4 generated at join time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Creates a new random `SessionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `SessionId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for SessionId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

/// One client's connected lifetime, bound to exactly one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Token addressing this session.
    pub id: SessionId,
    /// Identifier claimed by this session.
    pub user_id: UserId,
    /// When the identifier was claimed.
    pub joined_at: DateTime<Utc>,
}
