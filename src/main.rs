//! roomcast server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use roomcast::app_state::AppState;
use roomcast::build_app;
use roomcast::config::{ChatConfig, LogFormat};
use roomcast::domain::{EventBus, PresenceRegistry};
use roomcast::persistence::SqliteStore;
use roomcast::service::{ChatService, spawn_idle_sweeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ChatConfig::from_env().context("invalid LISTEN_ADDR")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting roomcast");

    // Build domain layer
    let registry = Arc::new(PresenceRegistry::new());
    let event_bus = EventBus::new(config.event_bus_capacity);

    // Build service layer
    let mut chat_service = ChatService::new(registry, event_bus);
    let store = if config.persistence_enabled {
        let store = SqliteStore::connect(
            &config.database_url,
            config.database_max_connections,
            config.database_connect_timeout(),
        )
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;
        chat_service = chat_service.with_store(Arc::new(store.clone()));
        chat_service
            .restore()
            .await
            .context("failed to restore room state")?;
        Some(store)
    } else {
        tracing::info!("persistence disabled, room state is in-memory only");
        None
    };

    let policy = config.heartbeat_policy();
    let sweeper = spawn_idle_sweeper(chat_service.clone(), policy);
    tracing::info!(timeout_secs = policy.timeout().as_secs(), "idle sweeper started");

    // Build application state and router
    let app = build_app(AppState::new(chat_service).with_heartbeat(policy));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    if let Some(store) = store {
        store.close().await;
    }
    tracing::info!("server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
