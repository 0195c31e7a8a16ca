//! Service layer: room orchestration and background maintenance.
//!
//! [`ChatService`] coordinates presence and messaging, writes through to
//! the optional store, and emits events through the
//! [`super::domain::EventBus`]. [`spawn_idle_sweeper`] evicts sessions
//! that stop heartbeating.

pub mod chat_service;
pub mod sweeper;

pub use chat_service::{ChatService, RestoreSummary};
pub use sweeper::{HeartbeatPolicy, spawn_idle_sweeper};
