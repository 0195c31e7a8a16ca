//! Domain layer: identifiers, presence, the message log, and events.
//!
//! This module contains the room's core model: validated user identifiers
//! and session handles, the presence registry that owns the connected set,
//! the broadcaster that owns the message log, and the event bus used to
//! push changes to subscribers.

pub mod chat_event;
pub mod event_bus;
pub mod message;
pub mod message_broadcaster;
pub mod presence_registry;
pub mod session;
pub mod user_id;

pub use chat_event::{ChatEvent, LeaveReason};
pub use event_bus::EventBus;
pub use message::ChatMessage;
pub use message_broadcaster::{MessageBroadcaster, Subscription};
pub use presence_registry::PresenceRegistry;
pub use session::{Session, SessionId};
pub use user_id::UserId;
