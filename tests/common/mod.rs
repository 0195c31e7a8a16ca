//! Shared helpers for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use roomcast::app_state::AppState;
use roomcast::build_app;
use roomcast::domain::{EventBus, PresenceRegistry};
use roomcast::service::ChatService;
use tokio::net::TcpListener;

/// Starts a server on an ephemeral port, returning its address and the
/// service behind it.
pub async fn spawn_server() -> (SocketAddr, ChatService) {
    let service = ChatService::new(Arc::new(PresenceRegistry::new()), EventBus::new(256));
    let app = build_app(AppState::new(service.clone()));

    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind ephemeral port");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, service)
}
