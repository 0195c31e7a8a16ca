//! WebSocket connection loop.
//!
//! Handles the read/write loop for a single session's WebSocket,
//! dispatching incoming commands and pushing room events in log order.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use super::cursor::DeliveryCursor;
use super::messages::{WsCommand, WsMessage};
use crate::api::dto::{MessageDto, MessageListResponse, UserListResponse};
use crate::domain::{ChatEvent, ChatMessage, LeaveReason, Session, Subscription};
use crate::error::ChatError;
use crate::service::ChatService;

type WsSink = SplitSink<WebSocket, Message>;

/// What the loop should do after handling one client frame.
#[derive(Debug)]
enum Outcome {
    /// Send the reply and keep going.
    Reply(WsMessage),
    /// Send the reply and close the connection.
    Close(WsMessage),
}

/// Runs the read/write loop for one session until the socket closes.
///
/// - Every inbound frame counts as a heartbeat for the session, and the
///   server pings every `ping_every` so listen-only clients answer with
///   pongs.
/// - Commands are dispatched to the [`ChatService`].
/// - Events from the [`Subscription`] are forwarded; if the receiver lags,
///   missed messages are replayed from the log and a fresh presence list
///   is pushed.
/// - If the session itself is evicted, its `user_left` event is pushed and
///   the socket is closed.
///
/// When the loop ends the session leaves the room.
pub async fn run_connection(
    socket: WebSocket,
    session: Session,
    subscription: Subscription,
    service: ChatService,
    ping_every: Duration,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let Subscription {
        last_seq,
        mut receiver,
    } = subscription;
    let mut cursor = DeliveryCursor::starting_after(last_seq);
    let ping_every = ping_every.max(Duration::from_millis(1));
    let mut ping = tokio::time::interval_at(Instant::now() + ping_every, ping_every);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(session_id = %session.id, user_id = %session.user_id, "ws connection opened");

    loop {
        tokio::select! {
            // Incoming frame from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match handle_text_message(text.as_str(), &session, &service).await {
                            Outcome::Reply(reply) => {
                                if !push(&mut ws_tx, &reply).await {
                                    break;
                                }
                            }
                            Outcome::Close(reply) => {
                                let _ = push(&mut ws_tx, &reply).await;
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_))) => {
                        if service.heartbeat(session.id).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                }
            }
            // Event from the room
            event = receiver.recv() => {
                match event {
                    Ok(event) => {
                        if let Some(msg) = render_event(&event, &mut cursor)
                            && !push(&mut ws_tx, &msg).await
                        {
                            break;
                        }
                        if ends_session(&event, &session, &service).await {
                            tracing::info!(session_id = %session.id, "closing ws for ended session");
                            let _ = ws_tx.send(Message::Close(None)).await;
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, session_id = %session.id, "ws client lagged behind event bus");
                        if !catch_up(&mut ws_tx, &service, &mut cursor).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping.tick() => {
                if ws_tx.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = service.leave(session.id, LeaveReason::Disconnected).await;
    tracing::debug!(session_id = %session.id, "ws connection closed");
}

/// Sends one envelope, returning `false` if the socket is gone.
async fn push(ws_tx: &mut WsSink, msg: &WsMessage) -> bool {
    ws_tx.send(Message::text(msg.to_json())).await.is_ok()
}

/// Converts a room event into an outgoing envelope, dropping message
/// events the cursor has already delivered.
fn render_event(event: &ChatEvent, cursor: &mut DeliveryCursor) -> Option<WsMessage> {
    if let Some(seq) = event.seq()
        && !cursor.admit(seq)
    {
        return None;
    }
    serde_json::to_value(event).ok().map(WsMessage::event)
}

/// Returns `true` if `event` reports this connection's own identifier
/// leaving and the session no longer exists.
async fn ends_session(event: &ChatEvent, session: &Session, service: &ChatService) -> bool {
    matches!(event, ChatEvent::UserLeft { user_id, .. } if *user_id == session.user_id)
        && service.session(session.id).await.is_err()
}

/// Replays messages missed during a lag, then pushes the current presence
/// list since presence events from the gap cannot be replayed.
async fn catch_up(ws_tx: &mut WsSink, service: &ChatService, cursor: &mut DeliveryCursor) -> bool {
    for message in service.messages_since(cursor.last_seq()).await {
        let event = ChatEvent::MessagePosted { message };
        if let Some(msg) = render_event(&event, cursor)
            && !push(ws_tx, &msg).await
        {
            return false;
        }
    }

    let users = UserListResponse::from(service.list_users().await);
    let snapshot = WsMessage::event(serde_json::json!({
        "event_type": "user_list",
        "users": users.users,
        "count": users.count,
    }));
    push(ws_tx, &snapshot).await
}

/// Handles a text frame from the client.
async fn handle_text_message(text: &str, session: &Session, service: &ChatService) -> Outcome {
    if let Err(err) = service.heartbeat(session.id).await {
        return Outcome::Close(WsMessage::error(String::new(), &err.to_body()));
    }

    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        let err = ChatError::InvalidRequest("malformed JSON".to_string());
        return Outcome::Reply(WsMessage::error(String::new(), &err.to_body()));
    };

    let Some(command) = msg.command() else {
        let err = ChatError::InvalidRequest("unknown command".to_string());
        return Outcome::Reply(WsMessage::error(msg.id, &err.to_body()));
    };

    let result = dispatch(command, session, service).await;
    match result {
        Ok(payload) => Outcome::Reply(WsMessage::response(msg.id, payload)),
        Err(err @ ChatError::SessionNotFound(_)) => {
            Outcome::Close(WsMessage::error(msg.id, &err.to_body()))
        }
        Err(err) => Outcome::Reply(WsMessage::error(msg.id, &err.to_body())),
    }
}

/// Executes one command, returning the response payload.
async fn dispatch(
    command: WsCommand,
    session: &Session,
    service: &ChatService,
) -> Result<serde_json::Value, ChatError> {
    let payload = match command {
        WsCommand::Send { body } => {
            let message = service.send(session.id, &body).await?;
            to_payload(&MessageDto::from(message))
        }
        WsCommand::Heartbeat => serde_json::json!({ "ok": true }),
        WsCommand::ListUsers => to_payload(&UserListResponse::from(service.list_users().await)),
        WsCommand::History => {
            let history: Vec<ChatMessage> = service.history().await;
            to_payload(&MessageListResponse::from(history))
        }
    };
    Ok(payload)
}

fn to_payload<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_default()
}
