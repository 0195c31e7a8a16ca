//! Chat error types with HTTP status code mapping.
//!
//! [`ChatError`] is the central error type for the crate. The four core
//! validation kinds (`AlreadyTaken`, `InvalidIdentifier`,
//! `SenderNotConnected`, `EmptyBody`) are expected outcomes surfaced to the
//! client for display; none of them is fatal to the process.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "identifier already in use: alice",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Error enum for presence, messaging, and storage operations.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 503 Service Unavailable      |
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The identifier is already claimed by a connected session.
    #[error("identifier already in use: {0}")]
    AlreadyTaken(String),

    /// The identifier is empty or whitespace only.
    #[error("invalid identifier: must not be empty")]
    InvalidIdentifier,

    /// The sender is not a member of the connected set.
    #[error("sender not connected: {0}")]
    SenderNotConnected(String),

    /// The message body is empty or whitespace only.
    #[error("message body must not be empty")]
    EmptyBody,

    /// No live session exists for the given token.
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    /// A WebSocket is already attached to the session.
    #[error("session already has a live connection: {0}")]
    AlreadyAttached(uuid::Uuid),

    /// The request could not be decoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The persistence collaborator failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl ChatError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidIdentifier => 1002,
            Self::EmptyBody => 1003,
            Self::AlreadyTaken(_) => 2001,
            Self::SenderNotConnected(_) => 2002,
            Self::SessionNotFound(_) => 2003,
            Self::AlreadyAttached(_) => 2004,
            Self::StorageUnavailable(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidIdentifier | Self::EmptyBody => {
                StatusCode::BAD_REQUEST
            }
            Self::AlreadyTaken(_) | Self::SenderNotConnected(_) | Self::AlreadyAttached(_) => {
                StatusCode::CONFLICT
            }
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns the structured body for this error.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.error_code(),
            message: self.to_string(),
            details: None,
        }
    }
}

impl From<sqlx::Error> for ChatError {
    fn from(err: sqlx::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

impl From<JsonRejection> for ChatError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ChatError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_body(),
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn core_kinds_map_to_client_errors() {
        assert_eq!(
            ChatError::AlreadyTaken("alice".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ChatError::InvalidIdentifier.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ChatError::SenderNotConnected("bob".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ChatError::EmptyBody.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_failure_is_distinct() {
        let err = ChatError::StorageUnavailable("disk full".to_string());
        assert_eq!(err.error_code(), 3001);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn body_carries_code_and_message() {
        let body = ChatError::AlreadyTaken("alice".to_string()).to_body();
        assert_eq!(body.code, 2001);
        assert_eq!(body.message, "identifier already in use: alice");
        assert!(body.details.is_none());
    }

    #[test]
    fn second_connection_is_conflict() {
        let err = ChatError::AlreadyAttached(uuid::Uuid::nil());
        assert_eq!(err.error_code(), 2004);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn into_response_sets_status() {
        let response = ChatError::EmptyBody.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
