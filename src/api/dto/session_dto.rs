//! Session and presence DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Session, UserId};

/// Request body for `POST /sessions`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRequest {
    /// Identifier to claim. Surrounding whitespace is trimmed.
    pub user_id: String,
}

/// Response body for `POST /sessions` (201 Created).
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    /// Token to use for sends, heartbeats, and leaving.
    pub session_id: uuid::Uuid,
    /// Identifier claimed by the session.
    pub user_id: String,
    /// When the identifier was claimed.
    pub joined_at: DateTime<Utc>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            session_id: *session.id.as_uuid(),
            user_id: session.user_id.into(),
            joined_at: session.joined_at,
        }
    }
}

/// Response body for `GET /users`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    /// Connected identifiers in lexicographic order.
    pub users: Vec<String>,
    /// Number of connected identifiers.
    pub count: usize,
}

impl From<Vec<UserId>> for UserListResponse {
    fn from(users: Vec<UserId>) -> Self {
        let users: Vec<String> = users.into_iter().map(String::from).collect();
        Self {
            count: users.len(),
            users,
        }
    }
}
