//! Shared application state injected into all Axum handlers.

use crate::domain::EventBus;
use crate::service::{ChatService, HeartbeatPolicy};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Chat service for all room operations.
    pub chat_service: ChatService,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Heartbeat cadence; WebSocket connections ping at this interval.
    pub heartbeat: HeartbeatPolicy,
}

impl AppState {
    /// Builds state around `chat_service`, sharing its event bus and using
    /// the default heartbeat policy.
    #[must_use]
    pub fn new(chat_service: ChatService) -> Self {
        let event_bus = chat_service.event_bus().clone();
        Self {
            chat_service,
            event_bus,
            heartbeat: HeartbeatPolicy::default(),
        }
    }

    /// Replaces the heartbeat policy.
    #[must_use]
    pub fn with_heartbeat(mut self, heartbeat: HeartbeatPolicy) -> Self {
        self.heartbeat = heartbeat;
        self
    }
}
