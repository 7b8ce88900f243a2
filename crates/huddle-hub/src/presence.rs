//! Presence tracker over the ephemeral store.
//!
//! One key per user (`presence:<userId>`) holding the status string, with
//! a short TTL refreshed on every inbound event. A user whose client dies
//! without a clean disconnect simply stops refreshing and expires into
//! `Offline` — expiry is silent, no offline event is emitted for it.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use huddle_core::{defaults, EphemeralStore, PresenceStatus, UserId};
use huddle_state::keys;

/// Tracks per-user liveness state in the ephemeral store.
#[derive(Clone)]
pub struct PresenceTracker {
    store: Arc<dyn EphemeralStore>,
    ttl: Duration,
}

impl PresenceTracker {
    pub fn new(store: Arc<dyn EphemeralStore>) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(defaults::PRESENCE_TTL_SECS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the user's status, (re)arming the TTL.
    pub async fn set(&self, user_id: UserId, status: PresenceStatus) -> bool {
        debug!(
            subsystem = "hub",
            component = "presence",
            user_id,
            status = status.as_str(),
            "presence set"
        );
        self.store
            .set(&keys::presence(user_id), status.as_str(), Some(self.ttl))
            .await
    }

    /// Refresh the TTL without changing the status. Called on every
    /// inbound event as an implicit heartbeat. False if the key already
    /// expired (the next `set` revives it).
    pub async fn refresh(&self, user_id: UserId) -> bool {
        self.store.expire(&keys::presence(user_id), self.ttl).await
    }

    /// Drop the user's presence entry on clean disconnect.
    pub async fn clear(&self, user_id: UserId) -> bool {
        self.store.del(&keys::presence(user_id)).await
    }

    /// Current status. Absence of the key reads as `Offline`; so does an
    /// unparseable value from an old writer.
    pub async fn status_of(&self, user_id: UserId) -> PresenceStatus {
        match self.store.get(&keys::presence(user_id)).await {
            Some(raw) => PresenceStatus::parse(&raw).unwrap_or(PresenceStatus::Offline),
            None => PresenceStatus::Offline,
        }
    }

    /// Whether the user currently reads as online.
    pub async fn is_online(&self, user_id: UserId) -> bool {
        self.status_of(user_id).await.is_online()
    }
}
