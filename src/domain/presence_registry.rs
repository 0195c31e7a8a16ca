//! Connected-user set with atomic claim semantics.
//!
//! [`PresenceRegistry`] stores every connected identifier together with the
//! session that claims it. The whole set sits behind a single
//! [`tokio::sync::RwLock`], so membership checks and inserts happen in one
//! critical section and two clients can never claim the same identifier.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{Session, SessionId, UserId};
use crate::error::ChatError;

/// Per-member bookkeeping kept alongside the identifier.
#[derive(Debug, Clone)]
struct Claim {
    session_id: SessionId,
    joined_at: DateTime<Utc>,
    last_seen: Instant,
    /// Whether a push connection currently serves this session.
    attached: bool,
}

/// Both indexes over the connected set, guarded together.
#[derive(Debug, Default)]
struct ConnectedSet {
    /// Members ordered lexicographically by identifier.
    members: BTreeMap<UserId, Claim>,
    /// Reverse index from session token to the identifier it claims.
    sessions: HashMap<SessionId, UserId>,
}

impl ConnectedSet {
    fn claim_mut(&mut self, session_id: SessionId) -> Option<&mut Claim> {
        let user_id = self.sessions.get(&session_id)?;
        self.members.get_mut(user_id)
    }

    fn remove_member(&mut self, user_id: &UserId) -> bool {
        match self.members.remove(user_id) {
            Some(claim) => {
                self.sessions.remove(&claim.session_id);
                true
            }
            None => false,
        }
    }
}

/// Set of currently connected user identifiers.
///
/// # Concurrency
///
/// - `join`, `leave`, `touch`, `attach`, `detach` and eviction take the
///   write lock.
/// - `list`, `is_member` and `resolve` take the read lock and may run
///   concurrently with each other.
#[derive(Debug)]
pub struct PresenceRegistry {
    set: RwLock<ConnectedSet>,
}

impl PresenceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            set: RwLock::new(ConnectedSet::default()),
        }
    }

    /// Claims `raw` for a new session.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidIdentifier`] if `raw` is blank after
    /// trimming, or [`ChatError::AlreadyTaken`] if another session already
    /// claims the identifier.
    pub async fn join(&self, raw: &str) -> Result<Session, ChatError> {
        let user_id = UserId::parse(raw)?;
        let mut set = self.set.write().await;
        if set.members.contains_key(&user_id) {
            return Err(ChatError::AlreadyTaken(user_id.to_string()));
        }

        let session = Session {
            id: SessionId::new(),
            user_id: user_id.clone(),
            joined_at: Utc::now(),
        };
        set.members.insert(
            user_id.clone(),
            Claim {
                session_id: session.id,
                joined_at: session.joined_at,
                last_seen: Instant::now(),
                attached: false,
            },
        );
        set.sessions.insert(session.id, user_id);
        Ok(session)
    }

    /// Removes `user_id` from the connected set.
    ///
    /// Absent identifiers are a no-op. Returns `true` if a member was
    /// removed.
    pub async fn leave(&self, user_id: &UserId) -> bool {
        self.set.write().await.remove_member(user_id)
    }

    /// Removes the member claimed by `session_id`.
    ///
    /// Returns the identifier that was released, or `None` if the token
    /// no longer owns a claim.
    pub async fn leave_session(&self, session_id: SessionId) -> Option<UserId> {
        let mut set = self.set.write().await;
        let user_id = set.sessions.get(&session_id).cloned()?;
        set.remove_member(&user_id);
        Some(user_id)
    }

    /// Returns the identifier claimed by `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::SessionNotFound`] if the session has left or
    /// was evicted.
    pub async fn resolve(&self, session_id: SessionId) -> Result<UserId, ChatError> {
        self.set
            .read()
            .await
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(ChatError::SessionNotFound(*session_id.as_uuid()))
    }

    /// Returns the full handle of a live session.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::SessionNotFound`] if the session has left or
    /// was evicted.
    pub async fn session(&self, session_id: SessionId) -> Result<Session, ChatError> {
        let set = self.set.read().await;
        set.sessions
            .get(&session_id)
            .and_then(|user_id| {
                set.members.get(user_id).map(|claim| Session {
                    id: session_id,
                    user_id: user_id.clone(),
                    joined_at: claim.joined_at,
                })
            })
            .ok_or(ChatError::SessionNotFound(*session_id.as_uuid()))
    }

    /// Records activity for `session_id`, returning its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::SessionNotFound`] if the session has left or
    /// was evicted.
    pub async fn touch(&self, session_id: SessionId) -> Result<UserId, ChatError> {
        let mut set = self.set.write().await;
        let user_id = set
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(ChatError::SessionNotFound(*session_id.as_uuid()))?;
        if let Some(claim) = set.members.get_mut(&user_id) {
            claim.last_seen = Instant::now();
        }
        Ok(user_id)
    }

    /// Marks `session_id` as served by a push connection.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::SessionNotFound`] if the session has ended, or
    /// [`ChatError::AlreadyAttached`] if another connection holds it.
    pub async fn attach(&self, session_id: SessionId) -> Result<(), ChatError> {
        let mut set = self.set.write().await;
        let Some(claim) = set.claim_mut(session_id) else {
            return Err(ChatError::SessionNotFound(*session_id.as_uuid()));
        };
        if claim.attached {
            return Err(ChatError::AlreadyAttached(*session_id.as_uuid()));
        }
        claim.attached = true;
        claim.last_seen = Instant::now();
        Ok(())
    }

    /// Releases the push connection slot of `session_id`, if it still
    /// exists.
    pub async fn detach(&self, session_id: SessionId) {
        if let Some(claim) = self.set.write().await.claim_mut(session_id) {
            claim.attached = false;
        }
    }

    /// Removes every member whose session has been silent for longer than
    /// `timeout`, returning the evicted identifiers in lexicographic order.
    pub async fn evict_idle(&self, timeout: Duration) -> Vec<UserId> {
        let now = Instant::now();
        let mut set = self.set.write().await;
        let idle: Vec<UserId> = set
            .members
            .iter()
            .filter(|(_, claim)| now.saturating_duration_since(claim.last_seen) > timeout)
            .map(|(user_id, _)| user_id.clone())
            .collect();
        for user_id in &idle {
            set.remove_member(user_id);
        }
        idle
    }

    /// Re-inserts identifiers loaded from storage.
    ///
    /// Each one gets a fresh token that no client holds, so it stays listed
    /// until idle eviction removes it. Identifiers already present are
    /// skipped. Returns how many were inserted.
    pub async fn restore(&self, user_ids: impl IntoIterator<Item = UserId>) -> usize {
        let now = Instant::now();
        let joined_at = Utc::now();
        let mut set = self.set.write().await;
        let mut restored = 0;
        for user_id in user_ids {
            if set.members.contains_key(&user_id) {
                continue;
            }
            let session_id = SessionId::new();
            set.members.insert(
                user_id.clone(),
                Claim {
                    session_id,
                    joined_at,
                    last_seen: now,
                    attached: false,
                },
            );
            set.sessions.insert(session_id, user_id);
            restored += 1;
        }
        restored
    }

    /// Returns `true` if `user_id` is currently connected.
    pub async fn is_member(&self, user_id: &UserId) -> bool {
        self.set.read().await.members.contains_key(user_id)
    }

    /// Returns connected identifiers in lexicographic order.
    pub async fn list(&self) -> Vec<UserId> {
        self.set.read().await.members.keys().cloned().collect()
    }

    /// Returns the number of connected identifiers.
    pub async fn len(&self) -> usize {
        self.set.read().await.members.len()
    }

    /// Returns `true` if nobody is connected.
    pub async fn is_empty(&self) -> bool {
        self.set.read().await.members.is_empty()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn user(raw: &str) -> UserId {
        let Ok(id) = UserId::parse(raw) else {
            panic!("valid identifier");
        };
        id
    }

    #[tokio::test]
    async fn join_twice_is_already_taken() {
        let registry = PresenceRegistry::new();
        assert!(registry.join("alice").await.is_ok());
        assert!(matches!(
            registry.join("alice").await,
            Err(ChatError::AlreadyTaken(id)) if id == "alice"
        ));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn padded_identifier_collides_with_trimmed() {
        let registry = PresenceRegistry::new();
        assert!(registry.join("alice").await.is_ok());
        assert!(matches!(
            registry.join("  alice ").await,
            Err(ChatError::AlreadyTaken(_))
        ));
    }

    #[tokio::test]
    async fn blank_identifier_is_invalid() {
        let registry = PresenceRegistry::new();
        assert!(matches!(
            registry.join("   ").await,
            Err(ChatError::InvalidIdentifier)
        ));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn list_is_lexicographic() {
        let registry = PresenceRegistry::new();
        let _ = registry.join("bob").await;
        let _ = registry.join("alice").await;

        let names: Vec<String> = registry.list().await.into_iter().map(String::from).collect();
        assert_eq!(names, vec!["alice".to_string(), "bob".to_string()]);
    }

    #[tokio::test]
    async fn leave_absent_is_noop() {
        let registry = PresenceRegistry::new();
        let _ = registry.join("bob").await;

        assert!(!registry.leave(&user("alice")).await);
        assert_eq!(registry.list().await, vec![user("bob")]);
    }

    #[tokio::test]
    async fn repeated_leave_is_idempotent() {
        let registry = PresenceRegistry::new();
        let _ = registry.join("alice").await;
        let _ = registry.join("bob").await;

        assert!(registry.leave(&user("alice")).await);
        for _ in 0..3 {
            assert!(!registry.leave(&user("alice")).await);
            assert_eq!(registry.list().await, vec![user("bob")]);
        }
    }

    #[tokio::test]
    async fn leave_frees_identifier_for_rejoin() {
        let registry = PresenceRegistry::new();
        let Ok(first) = registry.join("alice").await else {
            panic!("first join");
        };
        assert!(registry.leave(&user("alice")).await);

        let Ok(second) = registry.join("alice").await else {
            panic!("rejoin");
        };
        assert_ne!(first.id, second.id);
        assert!(registry.resolve(first.id).await.is_err());
    }

    #[tokio::test]
    async fn stale_session_cannot_release_new_claim() {
        let registry = PresenceRegistry::new();
        let Ok(old) = registry.join("alice").await else {
            panic!("join");
        };
        assert_eq!(registry.leave_session(old.id).await, Some(user("alice")));
        let Ok(_new) = registry.join("alice").await else {
            panic!("rejoin");
        };

        assert_eq!(registry.leave_session(old.id).await, None);
        assert!(registry.is_member(&user("alice")).await);
    }

    #[tokio::test]
    async fn one_connection_per_session() {
        let registry = PresenceRegistry::new();
        let Ok(session) = registry.join("alice").await else {
            panic!("join");
        };

        assert!(registry.attach(session.id).await.is_ok());
        assert!(matches!(
            registry.attach(session.id).await,
            Err(ChatError::AlreadyAttached(_))
        ));
        registry.detach(session.id).await;
        assert!(registry.attach(session.id).await.is_ok());

        registry.leave_session(session.id).await;
        assert!(matches!(
            registry.attach(session.id).await,
            Err(ChatError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn resolve_and_touch_follow_session() {
        let registry = PresenceRegistry::new();
        let Ok(session) = registry.join("carol").await else {
            panic!("join");
        };
        let Ok(resolved) = registry.resolve(session.id).await else {
            panic!("resolve");
        };
        assert_eq!(resolved, user("carol"));
        let Ok(handle) = registry.session(session.id).await else {
            panic!("session lookup");
        };
        assert_eq!(handle, session);
        assert!(registry.touch(session.id).await.is_ok());
        assert!(matches!(
            registry.touch(SessionId::new()).await,
            Err(ChatError::SessionNotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn evict_idle_removes_silent_sessions() {
        let registry = PresenceRegistry::new();
        let Ok(alice) = registry.join("alice").await else {
            panic!("join alice");
        };
        let _ = registry.join("bob").await;

        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(registry.touch(alice.id).await.is_ok());
        tokio::time::advance(Duration::from_secs(15)).await;

        let evicted = registry.evict_idle(Duration::from_secs(30)).await;
        assert_eq!(evicted, vec![user("bob")]);
        assert_eq!(registry.list().await, vec![user("alice")]);
    }

    #[tokio::test(start_paused = true)]
    async fn restored_members_expire_normally() {
        let registry = PresenceRegistry::new();
        let _ = registry.join("alice").await;
        let restored = registry.restore(vec![user("alice"), user("ghost")]).await;
        assert_eq!(restored, 1);
        assert!(matches!(
            registry.join("ghost").await,
            Err(ChatError::AlreadyTaken(_))
        ));

        tokio::time::advance(Duration::from_secs(31)).await;
        let evicted = registry.evict_idle(Duration::from_secs(30)).await;
        assert_eq!(evicted, vec![user("alice"), user("ghost")]);
        assert!(registry.join("ghost").await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_for_same_identifier_admit_one() {
        let registry = Arc::new(PresenceRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move { registry.join("alice").await }));
        }

        let mut admitted = 0;
        for handle in handles {
            let Ok(result) = handle.await else {
                panic!("task panicked");
            };
            if result.is_ok() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(registry.len().await, 1);
    }
}
