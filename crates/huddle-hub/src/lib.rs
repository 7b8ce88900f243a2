//! # huddle-hub
//!
//! The real-time core of huddle: connection registry, room broadcasting,
//! presence tracking, and the event dispatcher that ties them to the
//! access gate.
//!
//! Authorization model: room membership is transport state and is NEVER
//! trusted. Every inbound domain event is re-validated against the access
//! gate using the project id embedded in the event, so a revocation takes
//! effect on the very next event, not at the next reconnect. All denials
//! and failures answer with one uniform `error` frame that does not reveal
//! whether the target exists.

pub mod presence;
pub mod registry;
pub mod rooms;

pub use presence::PresenceTracker;
pub use registry::{ConnectionId, ConnectionRegistry, FrameSender};
pub use rooms::RoomBroadcaster;

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use huddle_core::{
    AccessGate, ActivityEntry, ClientEvent, EphemeralStore, PresenceStatus, ProjectRole, RoomKey,
    ServerEvent, TaskContext, UserId,
};
use huddle_state::{ActivityLog, ProjectSnapshotCache};

/// Central event dispatcher over the registry, rooms, and presence.
///
/// One instance is shared by every connection handler; all state inside is
/// concurrency-safe without an outer lock.
pub struct Hub {
    registry: ConnectionRegistry,
    rooms: RoomBroadcaster,
    presence: PresenceTracker,
    gate: Arc<dyn AccessGate>,
    snapshots: ProjectSnapshotCache,
    activity: ActivityLog,
}

impl Hub {
    pub fn new(gate: Arc<dyn AccessGate>, store: Arc<dyn EphemeralStore>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            rooms: RoomBroadcaster::new(),
            presence: PresenceTracker::new(store.clone()),
            gate,
            snapshots: ProjectSnapshotCache::new(store.clone()),
            activity: ActivityLog::new(store),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomBroadcaster {
        &self.rooms
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Attach an authenticated connection: register it, join the personal
    /// room, and mark the user active.
    pub async fn connect(&self, user_id: UserId, sender: FrameSender) -> ConnectionId {
        let connection_id = self.registry.register(user_id, sender);
        self.rooms.join(connection_id, RoomKey::User(user_id));
        self.presence.set(user_id, PresenceStatus::Active).await;

        info!(
            subsystem = "hub",
            op = "connect",
            user_id,
            connection_id = %connection_id,
            "connection attached"
        );
        connection_id
    }

    /// Detach a connection: leave every room, unregister, and on the
    /// user's last connection clear presence and announce `user-offline`
    /// to the project rooms it occupied.
    pub async fn disconnect(&self, connection_id: ConnectionId) {
        let rooms_left = self.rooms.leave_all(connection_id);
        let Some((user_id, last)) = self.registry.unregister(connection_id) else {
            return;
        };

        if last {
            self.presence.clear(user_id).await;
            for room in rooms_left {
                if matches!(room, RoomKey::Project(_)) {
                    self.rooms.broadcast(
                        &self.registry,
                        room,
                        &ServerEvent::UserOffline { user_id },
                        None,
                    );
                }
            }
        }

        info!(
            subsystem = "hub",
            op = "disconnect",
            user_id,
            connection_id = %connection_id,
            last_connection = last,
            "connection detached"
        );
    }

    /// Parse and dispatch one raw inbound frame.
    ///
    /// Malformed frames (bad JSON, unknown event name, missing fields) get
    /// a generic error answer; the connection stays open.
    pub async fn handle_frame(&self, connection_id: ConnectionId, raw: &str) {
        match serde_json::from_str::<ClientEvent>(raw) {
            Ok(event) => self.handle_event(connection_id, event).await,
            Err(e) => {
                warn!(
                    subsystem = "hub",
                    op = "handle_frame",
                    connection_id = %connection_id,
                    error = %e,
                    "malformed inbound frame"
                );
                self.send_event(connection_id, &ServerEvent::error("malformed event"));
            }
        }
    }

    /// Dispatch one decoded client event.
    pub async fn handle_event(&self, connection_id: ConnectionId, event: ClientEvent) {
        let Some(user_id) = self.registry.user_of(connection_id) else {
            // Raced a disconnect; nothing to answer.
            return;
        };

        // Any inbound traffic is an implicit heartbeat.
        self.presence.refresh(user_id).await;

        debug!(
            subsystem = "hub",
            op = "handle_event",
            user_id,
            connection_id = %connection_id,
            event = event.event_name(),
            "dispatching event"
        );

        match event {
            ClientEvent::JoinProject { project_id } => {
                self.join_project(connection_id, user_id, project_id).await;
            }
            ClientEvent::LeaveProject { project_id } => {
                self.leave_project(connection_id, user_id, project_id);
            }
            ClientEvent::TaskCreated {
                project_id,
                task_id,
                title,
            } => {
                if self
                    .authorize_task(connection_id, user_id, project_id, task_id)
                    .await
                    .is_none()
                {
                    return;
                }
                self.broadcast_project(
                    connection_id,
                    project_id,
                    &ServerEvent::TaskCreated {
                        project_id,
                        task_id,
                        title,
                        actor: user_id,
                    },
                );
                self.snapshots.invalidate(project_id).await;
                self.activity
                    .record(
                        project_id,
                        &ActivityEntry::new("task", user_id, format!("created task {task_id}")),
                    )
                    .await;
            }
            ClientEvent::TaskUpdated {
                project_id,
                task_id,
                status,
                title,
            } => {
                if self
                    .authorize_task(connection_id, user_id, project_id, task_id)
                    .await
                    .is_none()
                {
                    return;
                }
                self.broadcast_project(
                    connection_id,
                    project_id,
                    &ServerEvent::TaskUpdated {
                        project_id,
                        task_id,
                        status,
                        title,
                        actor: user_id,
                    },
                );
                self.snapshots.invalidate(project_id).await;
                self.activity
                    .record(
                        project_id,
                        &ActivityEntry::new("task", user_id, format!("updated task {task_id}")),
                    )
                    .await;
            }
            ClientEvent::NewMessage {
                project_id,
                discussion_id,
                body,
            } => {
                if self
                    .authorize(connection_id, user_id, project_id, ProjectRole::Member)
                    .await
                    .is_none()
                {
                    return;
                }
                self.broadcast_project(
                    connection_id,
                    project_id,
                    &ServerEvent::NewMessage {
                        project_id,
                        discussion_id,
                        body,
                        actor: user_id,
                    },
                );
                // Messages do not touch the cached project snapshot.
                self.activity
                    .record(
                        project_id,
                        &ActivityEntry::new("message", user_id, "posted a message"),
                    )
                    .await;
            }
            ClientEvent::ProjectUpdated { project_id } => {
                if self
                    .authorize(connection_id, user_id, project_id, ProjectRole::Member)
                    .await
                    .is_none()
                {
                    return;
                }
                self.broadcast_project(
                    connection_id,
                    project_id,
                    &ServerEvent::ProjectUpdated {
                        project_id,
                        actor: user_id,
                    },
                );
                self.snapshots.invalidate(project_id).await;
                self.activity
                    .record(
                        project_id,
                        &ActivityEntry::new("project", user_id, "updated the project"),
                    )
                    .await;
            }
            ClientEvent::MemberAdded {
                project_id,
                member_id,
            } => {
                // Membership changes need an elevated role.
                if self
                    .authorize(connection_id, user_id, project_id, ProjectRole::Admin)
                    .await
                    .is_none()
                {
                    return;
                }
                self.broadcast_project(
                    connection_id,
                    project_id,
                    &ServerEvent::MemberAdded {
                        project_id,
                        member_id,
                        actor: user_id,
                    },
                );
                self.snapshots.invalidate(project_id).await;
                self.activity
                    .record(
                        project_id,
                        &ActivityEntry::new("member", user_id, format!("added member {member_id}")),
                    )
                    .await;
            }
            ClientEvent::TypingStart {
                project_id,
                discussion_id,
            } => {
                self.relay_typing(connection_id, user_id, project_id, discussion_id, true)
                    .await;
            }
            ClientEvent::TypingStop {
                project_id,
                discussion_id,
            } => {
                self.relay_typing(connection_id, user_id, project_id, discussion_id, false)
                    .await;
            }
            ClientEvent::UpdatePresence { status } => {
                self.presence.set(user_id, status).await;
                let event = ServerEvent::UserPresenceChanged { user_id, status };
                for room in self.project_rooms_of_user(user_id) {
                    self.rooms
                        .broadcast(&self.registry, room, &event, Some(connection_id));
                }
            }
        }
    }

    /// Project-room admission: validate against the gate, join, ack, and
    /// let the room know the user is here.
    async fn join_project(&self, connection_id: ConnectionId, user_id: UserId, project_id: i64) {
        if self
            .authorize(connection_id, user_id, project_id, ProjectRole::Member)
            .await
            .is_none()
        {
            return;
        }

        let room = RoomKey::Project(project_id);
        self.rooms.join(connection_id, room);
        self.send_event(connection_id, &ServerEvent::ProjectJoined { project_id });
        self.rooms.broadcast(
            &self.registry,
            room,
            &ServerEvent::UserOnline { user_id },
            Some(connection_id),
        );
    }

    /// Leave a project room and let it know the user is gone — unless
    /// another connection of the same user is still in the room (multiple
    /// tabs), in which case the departure is invisible to the room.
    fn leave_project(&self, connection_id: ConnectionId, user_id: UserId, project_id: i64) {
        let room = RoomKey::Project(project_id);
        self.rooms.leave(connection_id, room);

        let still_present = self
            .rooms
            .members_of(room)
            .into_iter()
            .any(|c| self.registry.user_of(c) == Some(user_id));
        if !still_present {
            self.rooms.broadcast(
                &self.registry,
                room,
                &ServerEvent::UserOffline { user_id },
                Some(connection_id),
            );
        }
    }

    /// Gate check for one event. On denial or gate failure the sender gets
    /// the uniform denial frame and `None` comes back; gate failures fail
    /// closed.
    async fn authorize(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        project_id: i64,
        min_role: ProjectRole,
    ) -> Option<ProjectRole> {
        match self.gate.project_role(user_id, project_id).await {
            Ok(Some(role)) if role >= min_role => Some(role),
            Ok(_) => {
                debug!(
                    subsystem = "hub",
                    op = "authorize",
                    user_id,
                    project_id,
                    "denied"
                );
                self.send_event(connection_id, &ServerEvent::denied());
                None
            }
            Err(e) => {
                error!(
                    subsystem = "hub",
                    op = "authorize",
                    user_id,
                    project_id,
                    error = %e,
                    "gate lookup failed, denying"
                );
                self.send_event(connection_id, &ServerEvent::denied());
                None
            }
        }
    }

    /// Typing indicators: gated like any other event, broadcast to the
    /// project room, never persisted.
    async fn relay_typing(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        project_id: i64,
        discussion_id: i64,
        typing: bool,
    ) {
        if self
            .authorize(connection_id, user_id, project_id, ProjectRole::Member)
            .await
            .is_none()
        {
            return;
        }
        self.broadcast_project(
            connection_id,
            project_id,
            &ServerEvent::UserTyping {
                user_id,
                project_id,
                discussion_id,
                typing,
            },
        );
    }

    /// Task-scoped gate check: resolves access through the task itself,
    /// and rejects events whose embedded project id disagrees with the
    /// task's actual project. Same uniform denial as [`Hub::authorize`].
    async fn authorize_task(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        project_id: i64,
        task_id: i64,
    ) -> Option<TaskContext> {
        match self.gate.task_access(user_id, task_id).await {
            Ok(Some(ctx)) if ctx.project_id == project_id => Some(ctx),
            Ok(_) => {
                debug!(
                    subsystem = "hub",
                    op = "authorize_task",
                    user_id,
                    task_id,
                    project_id,
                    "denied"
                );
                self.send_event(connection_id, &ServerEvent::denied());
                None
            }
            Err(e) => {
                error!(
                    subsystem = "hub",
                    op = "authorize_task",
                    user_id,
                    task_id,
                    error = %e,
                    "gate lookup failed, denying"
                );
                self.send_event(connection_id, &ServerEvent::denied());
                None
            }
        }
    }

    fn broadcast_project(
        &self,
        sender: ConnectionId,
        project_id: i64,
        event: &ServerEvent,
    ) -> usize {
        self.rooms.broadcast(
            &self.registry,
            RoomKey::Project(project_id),
            event,
            Some(sender),
        )
    }

    /// Distinct project rooms occupied by any of the user's connections.
    fn project_rooms_of_user(&self, user_id: UserId) -> Vec<RoomKey> {
        let mut rooms: Vec<RoomKey> = self
            .registry
            .connections_of(user_id)
            .into_iter()
            .flat_map(|c| self.rooms.rooms_of(c))
            .filter(|r| matches!(r, RoomKey::Project(_)))
            .collect();
        rooms.sort_by_key(|r| r.to_string());
        rooms.dedup();
        rooms
    }

    fn send_event(&self, connection_id: ConnectionId, event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(frame) => {
                self.registry.send_to(connection_id, &frame);
            }
            Err(e) => {
                warn!(
                    subsystem = "hub",
                    connection_id = %connection_id,
                    event = event.event_name(),
                    error = %e,
                    "outbound event serialization failed"
                );
            }
        }
    }
}
