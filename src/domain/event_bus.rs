//! Broadcast channel for domain events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Presence changes
//! and accepted messages publish a [`ChatEvent`] through the bus, and every
//! WebSocket connection subscribes to receive them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use super::ChatEvent;

/// Broadcast bus for [`ChatEvent`]s.
///
/// Publishing never waits on receivers; when the ring buffer is full the
/// oldest events are dropped for lagging receivers, which then see
/// `RecvError::Lagged` and recover missed messages from the log. Clones
/// share the channel and the running count of published events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChatEvent>,
    published: Arc<AtomicU64>,
}

impl EventBus {
    /// Creates a bus holding up to `capacity` undelivered events per
    /// receiver. Zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publishes `event` to every live subscriber and returns how many
    /// received it. Events published to an empty room are still counted.
    pub fn publish(&self, event: ChatEvent) -> usize {
        let event_type = event.event_type_str();
        self.published.fetch_add(1, Ordering::Relaxed);
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::trace!(event_type, delivered, "event published");
        delivered
    }

    /// Subscribes to events published from now on.
    ///
    /// Connections should go through `MessageBroadcaster::subscribe`
    /// instead, which also reports the log position the stream starts at.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers, i.e. attached push connections.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total events published since the bus was created.
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
