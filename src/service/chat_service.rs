//! Chat service: orchestrates presence, messaging, storage, and events.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::{
    ChatEvent, ChatMessage, EventBus, LeaveReason, MessageBroadcaster, PresenceRegistry, Session,
    SessionId, Subscription, UserId,
};
use crate::error::ChatError;
use crate::persistence::ChatStore;

/// Counts of what [`ChatService::restore`] loaded from storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Identifiers re-inserted into the connected set.
    pub users: usize,
    /// Messages appended to the log.
    pub messages: usize,
}

/// Orchestration layer for all room operations.
///
/// Owns handles to the [`PresenceRegistry`] and [`MessageBroadcaster`],
/// the [`EventBus`] for presence events, and an optional [`ChatStore`].
/// Every mutation follows the pattern: change in-memory state → write
/// through to storage → emit events → return result.
#[derive(Clone)]
pub struct ChatService {
    registry: Arc<PresenceRegistry>,
    broadcaster: Arc<MessageBroadcaster>,
    event_bus: EventBus,
    store: Option<Arc<dyn ChatStore>>,
    /// Serializes presence changes with their store writes and events, so
    /// the users table and the event stream follow registry order.
    presence_lock: Arc<Mutex<()>>,
}

impl fmt::Debug for ChatService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatService")
            .field("registry", &self.registry)
            .field("broadcaster", &self.broadcaster)
            .field("event_bus", &self.event_bus)
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl ChatService {
    /// Creates an in-memory service around `registry`.
    #[must_use]
    pub fn new(registry: Arc<PresenceRegistry>, event_bus: EventBus) -> Self {
        let broadcaster = Arc::new(MessageBroadcaster::new(
            Arc::clone(&registry),
            event_bus.clone(),
        ));
        Self {
            registry,
            broadcaster,
            event_bus,
            store: None,
            presence_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Attaches a storage collaborator that every mutation writes through.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ChatStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns a reference to the inner [`PresenceRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<PresenceRegistry> {
        &self.registry
    }

    /// Returns a reference to the inner [`MessageBroadcaster`].
    #[must_use]
    pub fn broadcaster(&self) -> &Arc<MessageBroadcaster> {
        &self.broadcaster
    }

    /// Loads the stored connected set and message log.
    ///
    /// Call once at startup, before serving clients. Without a store this
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StorageUnavailable`] if either load fails.
    pub async fn restore(&self) -> Result<RestoreSummary, ChatError> {
        let Some(store) = &self.store else {
            return Ok(RestoreSummary::default());
        };
        let users = store.load_users().await?;
        let messages = store.load_messages().await?;

        let summary = RestoreSummary {
            users: self.registry.restore(users).await,
            messages: self.broadcaster.restore(messages).await,
        };
        tracing::info!(
            users = summary.users,
            messages = summary.messages,
            "restored room state"
        );
        Ok(summary)
    }

    /// Claims an identifier and returns the new session.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidIdentifier`] or
    /// [`ChatError::AlreadyTaken`] from the registry, or
    /// [`ChatError::StorageUnavailable`] if the join could not be stored,
    /// in which case the claim is released again.
    pub async fn join(&self, raw: &str) -> Result<Session, ChatError> {
        let _presence = self.presence_lock.lock().await;
        let session = self.registry.join(raw).await?;

        if let Some(store) = &self.store
            && let Err(err) = store.persist_join(&session.user_id).await
        {
            self.registry.leave_session(session.id).await;
            tracing::warn!(user_id = %session.user_id, error = %err, "join rolled back");
            return Err(err);
        }

        let _ = self.event_bus.publish(ChatEvent::UserJoined {
            user_id: session.user_id.clone(),
            timestamp: session.joined_at,
        });

        tracing::info!(user_id = %session.user_id, session_id = %session.id, "user joined");
        Ok(session)
    }

    /// Ends `session_id`, releasing its identifier.
    ///
    /// Stale or unknown sessions are a no-op. Returns the identifier that
    /// left, if any.
    pub async fn leave(&self, session_id: SessionId, reason: LeaveReason) -> Option<UserId> {
        let _presence = self.presence_lock.lock().await;
        let user_id = self.registry.leave_session(session_id).await?;
        self.after_leave(&user_id, reason).await;
        Some(user_id)
    }

    /// Returns the handle of a live session.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::SessionNotFound`] if the session has ended.
    pub async fn session(&self, session_id: SessionId) -> Result<Session, ChatError> {
        self.registry.session(session_id).await
    }

    /// Claims the single push-connection slot of `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::SessionNotFound`] if the session has ended, or
    /// [`ChatError::AlreadyAttached`] if another connection serves it.
    pub async fn attach(&self, session_id: SessionId) -> Result<(), ChatError> {
        self.registry.attach(session_id).await
    }

    /// Releases the push-connection slot of `session_id`.
    pub async fn detach(&self, session_id: SessionId) {
        self.registry.detach(session_id).await;
    }

    /// Records a heartbeat for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::SessionNotFound`] if the session has ended.
    pub async fn heartbeat(&self, session_id: SessionId) -> Result<UserId, ChatError> {
        self.registry.touch(session_id).await
    }

    /// Sends `body` as the user holding `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::SessionNotFound`] for an ended session,
    /// [`ChatError::SenderNotConnected`] or [`ChatError::EmptyBody`] from
    /// the broadcaster, or [`ChatError::StorageUnavailable`] if the
    /// accepted message could not be stored. In the storage case the
    /// message has already been delivered to live subscribers.
    pub async fn send(&self, session_id: SessionId, body: &str) -> Result<ChatMessage, ChatError> {
        let sender = self.registry.touch(session_id).await?;
        let message = self.broadcaster.send(&sender, body).await?;

        if let Some(store) = &self.store
            && let Err(err) = store.persist_message(&message).await
        {
            tracing::error!(seq = message.seq, error = %err, "message not stored");
            return Err(err);
        }
        Ok(message)
    }

    /// Returns connected identifiers in lexicographic order.
    pub async fn list_users(&self) -> Vec<UserId> {
        self.registry.list().await
    }

    /// Returns the full message log in arrival order.
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.broadcaster.history().await
    }

    /// Opens a push subscription positioned at the current log tail.
    pub async fn subscribe(&self) -> Subscription {
        self.broadcaster.subscribe().await
    }

    /// Returns messages with a sequence number greater than `after`.
    pub async fn messages_since(&self, after: u64) -> Vec<ChatMessage> {
        self.broadcaster.since(after).await
    }

    /// Evicts every session silent for longer than `timeout`.
    ///
    /// Returns the evicted identifiers in lexicographic order.
    pub async fn evict_idle(&self, timeout: Duration) -> Vec<UserId> {
        let _presence = self.presence_lock.lock().await;
        let evicted = self.registry.evict_idle(timeout).await;
        for user_id in &evicted {
            self.after_leave(user_id, LeaveReason::TimedOut).await;
        }
        evicted
    }

    async fn after_leave(&self, user_id: &UserId, reason: LeaveReason) {
        if let Some(store) = &self.store
            && let Err(err) = store.persist_leave(user_id).await
        {
            tracing::warn!(user_id = %user_id, error = %err, "leave not stored");
        }

        let _ = self.event_bus.publish(ChatEvent::UserLeft {
            user_id: user_id.clone(),
            reason,
            timestamp: Utc::now(),
        });

        tracing::info!(user_id = %user_id, ?reason, "user left");
    }
}
