//! Message handlers: send and history.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{MessageDto, MessageListResponse, SendMessageRequest};
use crate::app_state::AppState;
use crate::domain::SessionId;
use crate::error::{ChatError, ErrorResponse};

/// `POST /messages` — Send a message to the room.
///
/// # Errors
///
/// Returns [`ChatError::InvalidRequest`] for an undecodable body,
/// [`ChatError::SessionNotFound`] for an ended session,
/// [`ChatError::EmptyBody`] for a blank body, or
/// [`ChatError::StorageUnavailable`] if the message could not be stored.
#[utoipa::path(
    post,
    path = "/api/v1/messages",
    tag = "Messages",
    summary = "Send a message",
    description = "Appends a message to the room log and pushes it to every connected WebSocket subscriber.",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message accepted", body = MessageDto),
        (status = 400, description = "Malformed request or blank body", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Sender not connected", body = ErrorResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse),
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ChatError> {
    let Json(req) = payload?;
    let message = state
        .chat_service
        .send(SessionId::from_uuid(req.session_id), &req.body)
        .await?;
    Ok((StatusCode::CREATED, Json(MessageDto::from(message))))
}

/// `GET /messages` — Full message history.
#[utoipa::path(
    get,
    path = "/api/v1/messages",
    tag = "Messages",
    summary = "Message history",
    description = "Returns every message in arrival order.",
    responses(
        (status = 200, description = "Message log", body = MessageListResponse),
    )
)]
pub async fn history(State(state): State<AppState>) -> Json<MessageListResponse> {
    Json(MessageListResponse::from(state.chat_service.history().await))
}

/// Message routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/messages", get(history).post(send_message))
}
