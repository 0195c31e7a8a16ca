//! Append-only message log with push fan-out.
//!
//! [`MessageBroadcaster`] owns the room's message log. Each accepted
//! message is appended and published on the [`EventBus`] inside the same
//! write critical section, so the order subscribers observe is exactly the
//! order of the log.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{RwLock, broadcast};

use super::{ChatEvent, ChatMessage, EventBus, PresenceRegistry, UserId};
use crate::error::ChatError;

/// A live event feed paired with the log position it starts after.
///
/// Every message with `seq > last_seq` will arrive on `receiver` (or be
/// reported as lag); every message with `seq <= last_seq` is already in
/// the log.
#[derive(Debug)]
pub struct Subscription {
    /// Sequence number of the last message logged before subscribing.
    pub last_seq: u64,
    /// Receiver for events published after subscribing.
    pub receiver: broadcast::Receiver<ChatEvent>,
}

/// Accepts messages from connected users and delivers them to subscribers.
///
/// Holds a shared handle to the [`PresenceRegistry`] for sender
/// validation only; it never mutates presence.
#[derive(Debug)]
pub struct MessageBroadcaster {
    registry: Arc<PresenceRegistry>,
    log: RwLock<Vec<ChatMessage>>,
    event_bus: EventBus,
}

impl MessageBroadcaster {
    /// Creates a broadcaster with an empty log.
    #[must_use]
    pub fn new(registry: Arc<PresenceRegistry>, event_bus: EventBus) -> Self {
        Self {
            registry,
            log: RwLock::new(Vec::new()),
            event_bus,
        }
    }

    /// Appends a message from `sender` and fans it out.
    ///
    /// The membership check is a plain read taken before the append; a
    /// sender that disconnects in between still gets its message recorded.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::SenderNotConnected`] if `sender` is not in the
    /// connected set, or [`ChatError::EmptyBody`] if `body` is blank after
    /// trimming. Nothing is appended in either case.
    pub async fn send(&self, sender: &UserId, body: &str) -> Result<ChatMessage, ChatError> {
        if !self.registry.is_member(sender).await {
            return Err(ChatError::SenderNotConnected(sender.to_string()));
        }
        if body.trim().is_empty() {
            return Err(ChatError::EmptyBody);
        }

        let mut log = self.log.write().await;
        let seq = next_seq(&log);
        let message = ChatMessage::new(seq, sender.clone(), body.to_string(), Utc::now());
        log.push(message.clone());
        let receivers = self.event_bus.publish(ChatEvent::MessagePosted {
            message: message.clone(),
        });
        drop(log);

        tracing::debug!(seq, sender = %sender, receivers, "message broadcast");
        Ok(message)
    }

    /// Subscribes to the event bus at a known log position.
    ///
    /// The tail is read and the receiver created under the log lock, so no
    /// message can fall between the two.
    pub async fn subscribe(&self) -> Subscription {
        let log = self.log.read().await;
        Subscription {
            last_seq: log.last().map_or(0, |m| m.seq),
            receiver: self.event_bus.subscribe(),
        }
    }

    /// Returns the full log in arrival order.
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.log.read().await.clone()
    }

    /// Returns messages with a sequence number greater than `after`.
    pub async fn since(&self, after: u64) -> Vec<ChatMessage> {
        let log = self.log.read().await;
        let start = log.partition_point(|m| m.seq <= after);
        log.get(start..).map(<[ChatMessage]>::to_vec).unwrap_or_default()
    }

    /// Seeds the log with messages loaded from storage.
    ///
    /// Messages are ordered by sequence number and appended after whatever
    /// the log already holds; entries not newer than the current tail are
    /// skipped. Returns how many were appended.
    pub async fn restore(&self, mut messages: Vec<ChatMessage>) -> usize {
        messages.sort_by_key(|m| m.seq);
        let mut log = self.log.write().await;
        let mut restored = 0;
        for message in messages {
            if message.seq < next_seq(&log) {
                continue;
            }
            log.push(message);
            restored += 1;
        }
        restored
    }

    /// Returns the number of messages in the log.
    pub async fn len(&self) -> usize {
        self.log.read().await.len()
    }

    /// Returns `true` if no message has been accepted.
    pub async fn is_empty(&self) -> bool {
        self.log.read().await.is_empty()
    }
}

fn next_seq(log: &[ChatMessage]) -> u64 {
    log.last().map_or(1, |m| m.seq.saturating_add(1))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn user(raw: &str) -> UserId {
        let Ok(id) = UserId::parse(raw) else {
            panic!("valid identifier");
        };
        id
    }

    fn setup() -> (Arc<PresenceRegistry>, MessageBroadcaster, EventBus) {
        let registry = Arc::new(PresenceRegistry::new());
        let bus = EventBus::new(64);
        let broadcaster = MessageBroadcaster::new(Arc::clone(&registry), bus.clone());
        (registry, broadcaster, bus)
    }

    fn pairs(history: &[ChatMessage]) -> Vec<(String, String)> {
        history
            .iter()
            .map(|m| (m.sender.to_string(), m.body.clone()))
            .collect()
    }

    #[tokio::test]
    async fn send_from_non_member_is_rejected() {
        let (_registry, broadcaster, _bus) = setup();
        assert!(matches!(
            broadcaster.send(&user("alice"), "hi").await,
            Err(ChatError::SenderNotConnected(id)) if id == "alice"
        ));
        assert!(broadcaster.is_empty().await);
    }

    #[tokio::test]
    async fn blank_body_is_rejected() {
        let (registry, broadcaster, _bus) = setup();
        let _ = registry.join("alice").await;
        assert!(matches!(
            broadcaster.send(&user("alice"), "  ").await,
            Err(ChatError::EmptyBody)
        ));
        assert!(broadcaster.is_empty().await);
    }

    #[tokio::test]
    async fn history_is_arrival_order() {
        let (registry, broadcaster, _bus) = setup();
        let _ = registry.join("alice").await;
        let _ = registry.join("bob").await;

        assert!(broadcaster.send(&user("alice"), "hi").await.is_ok());
        assert!(broadcaster.send(&user("bob"), "yo").await.is_ok());

        let history = broadcaster.history().await;
        assert_eq!(
            pairs(&history),
            vec![
                ("alice".to_string(), "hi".to_string()),
                ("bob".to_string(), "yo".to_string()),
            ]
        );
        let seqs: Vec<u64> = history.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[tokio::test]
    async fn subscribers_receive_in_log_order() {
        let (registry, broadcaster, bus) = setup();
        let _ = registry.join("alice").await;
        let mut rx = bus.subscribe();

        for body in ["one", "two", "three"] {
            assert!(broadcaster.send(&user("alice"), body).await.is_ok());
        }

        let mut seen = Vec::new();
        for _ in 0..3 {
            let Ok(ChatEvent::MessagePosted { message }) = rx.recv().await else {
                panic!("expected message event");
            };
            seen.push(message.body);
        }
        assert_eq!(seen, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn late_subscriber_only_sees_new_messages() {
        let (registry, broadcaster, bus) = setup();
        let _ = registry.join("alice").await;
        assert!(broadcaster.send(&user("alice"), "before").await.is_ok());

        let mut rx = bus.subscribe();
        assert!(broadcaster.send(&user("alice"), "after").await.is_ok());

        let Ok(ChatEvent::MessagePosted { message }) = rx.recv().await else {
            panic!("expected message event");
        };
        assert_eq!(message.body, "after");
        assert_eq!(broadcaster.len().await, 2);
    }

    #[tokio::test]
    async fn subscription_starts_after_logged_tail() {
        let (registry, broadcaster, _bus) = setup();
        let _ = registry.join("alice").await;
        let _ = broadcaster.send(&user("alice"), "old").await;

        let mut sub = broadcaster.subscribe().await;
        assert_eq!(sub.last_seq, 1);

        let _ = broadcaster.send(&user("alice"), "new").await;
        let Ok(event) = sub.receiver.recv().await else {
            panic!("expected event");
        };
        assert_eq!(event.seq(), Some(2));
    }

    #[tokio::test]
    async fn since_returns_tail() {
        let (registry, broadcaster, _bus) = setup();
        let _ = registry.join("alice").await;
        for body in ["a", "b", "c", "d"] {
            let _ = broadcaster.send(&user("alice"), body).await;
        }

        let tail: Vec<String> = broadcaster
            .since(2)
            .await
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(tail, vec!["c", "d"]);
        assert!(broadcaster.since(4).await.is_empty());
        assert_eq!(broadcaster.since(0).await.len(), 4);
    }

    #[tokio::test]
    async fn restore_continues_sequence() {
        let (registry, broadcaster, _bus) = setup();
        let stored = vec![
            ChatMessage::new(2, user("bob"), "yo".to_string(), Utc::now()),
            ChatMessage::new(1, user("alice"), "hi".to_string(), Utc::now()),
        ];
        assert_eq!(broadcaster.restore(stored).await, 2);

        let _ = registry.join("carol").await;
        let Ok(next) = broadcaster.send(&user("carol"), "hey").await else {
            panic!("send after restore");
        };
        assert_eq!(next.seq, 3);
        assert_eq!(
            pairs(&broadcaster.history().await),
            vec![
                ("alice".to_string(), "hi".to_string()),
                ("bob".to_string(), "yo".to_string()),
                ("carol".to_string(), "hey".to_string()),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sends_get_distinct_sequence_numbers() {
        let registry = Arc::new(PresenceRegistry::new());
        let broadcaster = Arc::new(MessageBroadcaster::new(
            Arc::clone(&registry),
            EventBus::new(256),
        ));
        let _ = registry.join("alice").await;

        let mut handles = Vec::new();
        for i in 0..50 {
            let broadcaster = Arc::clone(&broadcaster);
            handles.push(tokio::spawn(async move {
                broadcaster.send(&user("alice"), &format!("msg {i}")).await
            }));
        }
        for handle in handles {
            let Ok(Ok(_)) = handle.await else {
                panic!("send failed");
            };
        }

        let seqs: Vec<u64> = broadcaster.history().await.iter().map(|m| m.seq).collect();
        let expected: Vec<u64> = (1..=50).collect();
        assert_eq!(seqs, expected);
    }
}
