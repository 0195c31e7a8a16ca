//! Background eviction of sessions that stopped heartbeating.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::ChatService;

/// Heartbeat policy: how often clients ping and how long silence lasts
/// before a session is evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatPolicy {
    /// Expected interval between client heartbeats.
    pub interval: Duration,
    /// Number of missed intervals tolerated before eviction.
    pub missed_beats: u32,
}

impl HeartbeatPolicy {
    /// Returns the silence after which a session is evicted.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.interval.saturating_mul(self.missed_beats.max(1))
    }
}

impl Default for HeartbeatPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            missed_beats: 3,
        }
    }
}

/// Spawns a task that evicts idle sessions once per heartbeat interval.
///
/// The task runs until aborted through the returned handle.
pub fn spawn_idle_sweeper(service: ChatService, policy: HeartbeatPolicy) -> JoinHandle<()> {
    let timeout = policy.timeout();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(policy.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = service.evict_idle(timeout).await;
            if !evicted.is_empty() {
                tracing::info!(count = evicted.len(), "evicted idle sessions");
            }
        }
    })
}
