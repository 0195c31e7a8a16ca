//! Persistence layer: durable copy of the connected set and message log.
//!
//! Provides the [`ChatStore`] trait the service writes through on every
//! join, leave, and accepted message, and reads once at startup. The
//! concrete implementation uses `sqlx::SqlitePool` with the two-table
//! layout `users(user_id)` / `messages(seq, user, text, timestamp)`.

pub mod models;
pub mod sqlite;

use async_trait::async_trait;

use crate::domain::{ChatMessage, UserId};
use crate::error::ChatError;

pub use sqlite::SqliteStore;

/// Storage collaborator for presence and messages.
///
/// Every method reports failure as [`ChatError::StorageUnavailable`].
/// Implementations must tolerate a join for an identifier that is already
/// stored and a leave for one that is not.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Loads every stored identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StorageUnavailable`] on storage failure.
    async fn load_users(&self) -> Result<Vec<UserId>, ChatError>;

    /// Loads every stored message ordered by sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StorageUnavailable`] on storage failure.
    async fn load_messages(&self) -> Result<Vec<ChatMessage>, ChatError>;

    /// Records that `user_id` joined.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StorageUnavailable`] on storage failure.
    async fn persist_join(&self, user_id: &UserId) -> Result<(), ChatError>;

    /// Records that `user_id` left.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StorageUnavailable`] on storage failure.
    async fn persist_leave(&self, user_id: &UserId) -> Result<(), ChatError>;

    /// Appends `message` to the stored log.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StorageUnavailable`] on storage failure.
    async fn persist_message(&self, message: &ChatMessage) -> Result<(), ChatError>;
}
