//! Room broadcaster: named fan-out groups over live connections.
//!
//! Rooms hold connection ids, not user ids — a user with three tabs in a
//! project occupies the room three times and each tab receives its own
//! frame. Membership here is transport state only; authorization lives in
//! the access gate and is re-checked per event, never inferred from room
//! membership.

use dashmap::{DashMap, DashSet};
use tracing::{debug, warn};

use huddle_core::{RoomKey, ServerEvent, UserId};

use crate::registry::{ConnectionId, ConnectionRegistry};

/// Bidirectional room membership index.
#[derive(Default)]
pub struct RoomBroadcaster {
    room_members: DashMap<RoomKey, DashSet<ConnectionId>>,
    member_rooms: DashMap<ConnectionId, DashSet<RoomKey>>,
}

impl RoomBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Idempotent.
    pub fn join(&self, connection_id: ConnectionId, room: RoomKey) {
        self.room_members
            .entry(room)
            .or_default()
            .insert(connection_id);
        self.member_rooms
            .entry(connection_id)
            .or_default()
            .insert(room);
        debug!(
            subsystem = "hub",
            component = "rooms",
            op = "join",
            connection_id = %connection_id,
            room = %room,
            "joined room"
        );
    }

    /// Remove a connection from a room. A room with no members left is
    /// dropped from the index.
    pub fn leave(&self, connection_id: ConnectionId, room: RoomKey) {
        if let Some(set) = self.room_members.get(&room) {
            set.remove(&connection_id);
        }
        // Emptiness is re-checked under the shard lock: a join landing
        // between our removal and this point keeps the room alive.
        self.room_members.remove_if(&room, |_, set| set.is_empty());

        if let Some(set) = self.member_rooms.get(&connection_id) {
            set.remove(&room);
        }
    }

    /// Remove a connection from every room it occupies, returning the
    /// rooms it was in. Called on disconnect; must leave no trace.
    pub fn leave_all(&self, connection_id: ConnectionId) -> Vec<RoomKey> {
        let rooms = self.rooms_of(connection_id);
        for room in &rooms {
            self.leave(connection_id, *room);
        }
        self.member_rooms.remove(&connection_id);
        rooms
    }

    /// Rooms a connection currently occupies.
    pub fn rooms_of(&self, connection_id: ConnectionId) -> Vec<RoomKey> {
        self.member_rooms
            .get(&connection_id)
            .map(|s| s.iter().map(|r| *r).collect())
            .unwrap_or_default()
    }

    /// Connection ids in a room.
    pub fn members_of(&self, room: RoomKey) -> Vec<ConnectionId> {
        self.room_members
            .get(&room)
            .map(|s| s.iter().map(|c| *c).collect())
            .unwrap_or_default()
    }

    /// Distinct users present in a room.
    pub fn users_in(&self, room: RoomKey, registry: &ConnectionRegistry) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .members_of(room)
            .into_iter()
            .filter_map(|c| registry.user_of(c))
            .collect();
        users.sort_unstable();
        users.dedup();
        users
    }

    /// Serialize `event` once and queue it to every member of `room`,
    /// excluding `exclude` (typically the sender). Returns the number of
    /// connections that received the frame.
    pub fn broadcast(
        &self,
        registry: &ConnectionRegistry,
        room: RoomKey,
        event: &ServerEvent,
        exclude: Option<ConnectionId>,
    ) -> usize {
        let frame = match serde_json::to_string(event) {
            Ok(f) => f,
            Err(e) => {
                warn!(
                    subsystem = "hub",
                    component = "rooms",
                    room = %room,
                    event = event.event_name(),
                    error = %e,
                    "outbound event serialization failed"
                );
                return 0;
            }
        };

        let mut delivered = 0;
        for member in self.members_of(room) {
            if Some(member) == exclude {
                continue;
            }
            if registry.send_to(member, &frame) {
                delivered += 1;
            }
        }

        debug!(
            subsystem = "hub",
            component = "rooms",
            op = "broadcast",
            room = %room,
            event = event.event_name(),
            recipient_count = delivered,
            "broadcast delivered"
        );
        delivered
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.room_members.len()
    }
}
