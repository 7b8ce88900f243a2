//! Connection registry: live transport connections per user.
//!
//! A user may hold any number of simultaneous connections (multiple tabs,
//! multiple devices). Each connection gets an opaque id at registration and
//! an outbound frame channel; the socket layer drains the channel. Lookups
//! never fail hard — a connection that raced a disconnect simply receives
//! nothing.

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use huddle_core::UserId;

/// Opaque identifier of one live connection.
pub type ConnectionId = Uuid;

/// Sender half of a connection's outbound frame channel.
pub type FrameSender = mpsc::UnboundedSender<String>;

struct ConnectionEntry {
    user_id: UserId,
    sender: FrameSender,
    connected_at: DateTime<Utc>,
}

/// Registry of all live connections, with a reverse index per user.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    user_connections: DashMap<UserId, DashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection for `user_id`, returning its id.
    pub fn register(&self, user_id: UserId, sender: FrameSender) -> ConnectionId {
        let connection_id = Uuid::now_v7();
        self.connections.insert(
            connection_id,
            ConnectionEntry {
                user_id,
                sender,
                connected_at: Utc::now(),
            },
        );
        self.user_connections
            .entry(user_id)
            .or_default()
            .insert(connection_id);

        debug!(
            subsystem = "hub",
            component = "registry",
            op = "register",
            user_id,
            connection_id = %connection_id,
            "connection registered"
        );
        connection_id
    }

    /// Remove a connection. Returns the owning user and whether this was
    /// the user's last connection, or `None` if the id was unknown.
    pub fn unregister(&self, connection_id: ConnectionId) -> Option<(UserId, bool)> {
        let (_, entry) = self.connections.remove(&connection_id)?;
        let user_id = entry.user_id;

        if let Some(set) = self.user_connections.get(&user_id) {
            set.remove(&connection_id);
        }
        // Emptiness is re-checked under the shard lock: a register landing
        // between our removal and this point keeps the user entry alive,
        // and `last` then comes back false.
        let last = self
            .user_connections
            .remove_if(&user_id, |_, set| set.is_empty())
            .is_some()
            || !self.user_connections.contains_key(&user_id);

        debug!(
            subsystem = "hub",
            component = "registry",
            op = "unregister",
            user_id,
            connection_id = %connection_id,
            last_connection = last,
            duration_ms = (Utc::now() - entry.connected_at).num_milliseconds(),
            "connection unregistered"
        );
        Some((user_id, last))
    }

    /// Owning user of a connection.
    pub fn user_of(&self, connection_id: ConnectionId) -> Option<UserId> {
        self.connections.get(&connection_id).map(|e| e.user_id)
    }

    /// All connection ids for a user. Empty when offline.
    pub fn connections_of(&self, user_id: UserId) -> Vec<ConnectionId> {
        self.user_connections
            .get(&user_id)
            .map(|s| s.iter().map(|c| *c).collect())
            .unwrap_or_default()
    }

    /// Whether the user has at least one live connection.
    pub fn is_connected(&self, user_id: UserId) -> bool {
        self.user_connections
            .get(&user_id)
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    }

    /// Queue a frame to one connection. Returns false if the connection is
    /// gone or its channel is closed.
    pub fn send_to(&self, connection_id: ConnectionId, frame: &str) -> bool {
        match self.connections.get(&connection_id) {
            Some(entry) => entry.sender.send(frame.to_string()).is_ok(),
            None => false,
        }
    }

    /// Total live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Distinct users with at least one connection.
    pub fn user_count(&self) -> usize {
        self.user_connections.len()
    }
}
