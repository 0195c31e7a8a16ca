//! WebSocket layer: connection handling, commands, and push delivery.
//!
//! The WebSocket endpoint at `/ws` attaches to an existing session and
//! provides bidirectional communication: room events are pushed as they
//! happen, and clients may send, heartbeat, and query over the same socket.

pub mod connection;
pub mod cursor;
pub mod handler;
pub mod messages;
