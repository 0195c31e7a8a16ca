//! Validated user identifier.
//!
//! [`UserId`] is a newtype over `String` that can only be constructed from
//! input that is non-empty after trimming whitespace. The stored form is the
//! trimmed text, so padded duplicates cannot claim a second slot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Identifier of a connected user.
///
/// Opaque to the core: it has no lifecycle of its own, existence is purely
/// membership in [`super::PresenceRegistry`]. Ordering is lexicographic on
/// the underlying text, which is the order used by presence listings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Parses an identifier, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidIdentifier`] if the input is empty or
    /// whitespace only.
    pub fn parse(raw: &str) -> Result<Self, ChatError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ChatError::InvalidIdentifier);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = ChatError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
