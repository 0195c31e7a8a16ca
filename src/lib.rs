//! # roomcast
//!
//! Single-room chat server: tracks which user identifiers are connected,
//! keeps an ordered message history, and pushes every new message and
//! presence change to all connected clients.
//!
//! Clients join over REST to claim an identifier, then upgrade to a
//! WebSocket at `/ws` to receive pushed events and send commands. An
//! optional SQLite store lets the room survive restarts.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── ChatService + idle sweeper (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── PresenceRegistry (domain/)
//!     ├── MessageBroadcaster (domain/)
//!     │
//!     └── SQLite Persistence (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the full application: REST API, OpenAPI docs, and the `/ws`
/// endpoint, with tracing and CORS layers applied.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws::handler::ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
