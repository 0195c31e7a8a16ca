//! Session and presence handlers: join, leave, heartbeat, list.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::api::dto::{JoinRequest, SessionResponse, UserListResponse};
use crate::app_state::AppState;
use crate::domain::{LeaveReason, SessionId};
use crate::error::{ChatError, ErrorResponse};

/// `POST /sessions` — Claim an identifier and open a session.
///
/// # Errors
///
/// Returns [`ChatError::InvalidRequest`] for an undecodable body,
/// [`ChatError::InvalidIdentifier`] for a blank identifier,
/// [`ChatError::AlreadyTaken`] if it is in use, or
/// [`ChatError::StorageUnavailable`] if the join could not be stored.
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "Sessions",
    summary = "Join the room",
    description = "Claims an identifier for a new session. Identifiers are unique among connected users.",
    request_body = JoinRequest,
    responses(
        (status = 201, description = "Session opened", body = SessionResponse),
        (status = 400, description = "Malformed body or blank identifier", body = ErrorResponse),
        (status = 409, description = "Identifier already in use", body = ErrorResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse),
    )
)]
pub async fn join(
    State(state): State<AppState>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ChatError> {
    let Json(req) = payload?;
    let session = state.chat_service.join(&req.user_id).await?;
    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

/// `DELETE /sessions/:id` — Leave the room.
///
/// Idempotent: unknown or already-ended sessions also return 204.
///
/// # Errors
///
/// Returns [`ChatError::InvalidRequest`] if `id` is not a UUID.
#[utoipa::path(
    delete,
    path = "/api/v1/sessions/{id}",
    tag = "Sessions",
    summary = "Leave the room",
    description = "Ends the session and releases its identifier. Repeating the call is a no-op.",
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 204, description = "Session ended"),
        (status = 400, description = "Malformed session id", body = ErrorResponse),
    )
)]
pub async fn leave(
    State(state): State<AppState>,
    id: Result<Path<uuid::Uuid>, PathRejection>,
) -> Result<StatusCode, ChatError> {
    let Path(id) = id?;
    let _ = state
        .chat_service
        .leave(SessionId::from_uuid(id), LeaveReason::Requested)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /sessions/:id/heartbeat` — Keep a session alive.
///
/// # Errors
///
/// Returns [`ChatError::InvalidRequest`] if `id` is not a UUID, or
/// [`ChatError::SessionNotFound`] if the session has ended or was evicted.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/heartbeat",
    tag = "Sessions",
    summary = "Heartbeat",
    description = "Refreshes the session's activity timestamp so it is not evicted as idle.",
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 204, description = "Heartbeat recorded"),
        (status = 400, description = "Malformed session id", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn heartbeat(
    State(state): State<AppState>,
    id: Result<Path<uuid::Uuid>, PathRejection>,
) -> Result<StatusCode, ChatError> {
    let Path(id) = id?;
    state
        .chat_service
        .heartbeat(SessionId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /users` — List connected identifiers.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Sessions",
    summary = "List connected users",
    description = "Returns connected identifiers in lexicographic order.",
    responses(
        (status = 200, description = "Connected users", body = UserListResponse),
    )
)]
pub async fn list_users(State(state): State<AppState>) -> Json<UserListResponse> {
    Json(UserListResponse::from(state.chat_service.list_users().await))
}

/// Session and presence routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(join))
        .route("/sessions/{id}", delete(leave))
        .route("/sessions/{id}/heartbeat", post(heartbeat))
        .route("/users", get(list_users))
}
