//! Data Transfer Objects for REST request/response serialization.
//!
//! Identifiers cross the wire as plain strings; validation happens in the
//! domain layer so every transport reports the same error kinds.

pub mod message_dto;
pub mod session_dto;

pub use message_dto::*;
pub use session_dto::*;
