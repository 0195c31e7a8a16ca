//! SQLite implementation of the persistence layer.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::ChatStore;
use super::models::StoredMessage;
use crate::domain::{ChatMessage, UserId};
use crate::error::ChatError;

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS users (user_id TEXT PRIMARY KEY)";

const CREATE_MESSAGES: &str = "CREATE TABLE IF NOT EXISTS messages \
     (seq INTEGER PRIMARY KEY, user TEXT NOT NULL, text TEXT NOT NULL, timestamp TEXT NOT NULL)";

/// SQLite-backed store using `sqlx::SqlitePool`.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url` and ensures the
    /// schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StorageUnavailable`] if the URL is invalid, the
    /// database cannot be opened, or the schema cannot be created.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, ChatError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(connect_timeout)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Opens a private in-memory database.
    ///
    /// The pool is pinned to one connection that never expires, since each
    /// SQLite in-memory connection is its own database.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StorageUnavailable`] if the schema cannot be
    /// created.
    pub async fn in_memory() -> Result<Self, ChatError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Wraps an existing pool, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StorageUnavailable`] if the schema cannot be
    /// created.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, ChatError> {
        sqlx::query(CREATE_USERS).execute(&pool).await?;
        sqlx::query(CREATE_MESSAGES).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn load_users(&self) -> Result<Vec<UserId>, ChatError> {
        let rows = sqlx::query_scalar::<_, String>("SELECT user_id FROM users ORDER BY user_id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|raw| match UserId::parse(&raw) {
                Ok(user_id) => Some(user_id),
                Err(_) => {
                    tracing::warn!(raw = %raw, "skipping stored user with blank identifier");
                    None
                }
            })
            .collect())
    }

    async fn load_messages(&self) -> Result<Vec<ChatMessage>, ChatError> {
        let rows = sqlx::query_as::<_, StoredMessage>(
            "SELECT seq, user, text, timestamp FROM messages ORDER BY seq ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ChatMessage::try_from).collect()
    }

    async fn persist_join(&self, user_id: &UserId) -> Result<(), ChatError> {
        sqlx::query("INSERT OR IGNORE INTO users (user_id) VALUES (?)")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn persist_leave(&self, user_id: &UserId) -> Result<(), ChatError> {
        sqlx::query("DELETE FROM users WHERE user_id = ?")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn persist_message(&self, message: &ChatMessage) -> Result<(), ChatError> {
        let row = StoredMessage::from(message);
        sqlx::query("INSERT INTO messages (seq, user, text, timestamp) VALUES (?, ?, ?, ?)")
            .bind(row.seq)
            .bind(row.user)
            .bind(row.text)
            .bind(row.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
