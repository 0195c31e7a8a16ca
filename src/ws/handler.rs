//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::domain::SessionId;
use crate::error::ChatError;

/// Query parameters for `GET /ws`.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Session returned by `POST /api/v1/sessions`.
    pub session_id: uuid::Uuid,
}

/// `GET /ws?session_id=…` — Upgrade an existing session to a push stream.
///
/// A session is served by at most one connection at a time.
///
/// # Errors
///
/// Returns [`ChatError::SessionNotFound`] if the session has ended, or
/// [`ChatError::AlreadyAttached`] if another socket already serves it.
/// Both are reported before any upgrade happens.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
) -> Result<impl IntoResponse, ChatError> {
    let service = state.chat_service.clone();
    let session_id = SessionId::from_uuid(params.session_id);
    let session = service.session(session_id).await?;
    service.attach(session_id).await?;
    let subscription = service.subscribe().await;

    let release = service.clone();
    let ping_every = state.heartbeat.interval;
    Ok(ws
        .on_failed_upgrade(move |err| {
            tracing::warn!(session_id = %session_id, error = %err, "ws upgrade failed");
            tokio::spawn(async move { release.detach(session_id).await });
        })
        .on_upgrade(move |socket| {
            run_connection(socket, session, subscription, service, ping_every)
        }))
}
