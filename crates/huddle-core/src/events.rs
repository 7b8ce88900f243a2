//! Real-time wire protocol: inbound client events and outbound server events.
//!
//! All frames are JSON with an adjacent tag:
//!
//! ```text
//! {"event":"join-project","data":{"projectId":42}}
//! ```
//!
//! Event names are kebab-case and payload fields camelCase — a stable
//! contract with browser clients. Unknown inbound events fail
//! deserialization and are answered with a generic `error` frame.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{PresenceStatus, UserId};

// =============================================================================
// INBOUND (client → hub)
// =============================================================================

/// Event sent by a connected client.
///
/// Every domain event carries the project/task id it targets; the hub
/// re-validates the sender against the access gate using that embedded id
/// before any broadcast. Room membership at join time is never sufficient.
#[derive(Debug, Clone, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase",
    deny_unknown_fields
)]
pub enum ClientEvent {
    JoinProject {
        project_id: i64,
    },
    LeaveProject {
        project_id: i64,
    },
    TaskCreated {
        project_id: i64,
        task_id: i64,
        title: String,
    },
    TaskUpdated {
        project_id: i64,
        task_id: i64,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
    NewMessage {
        project_id: i64,
        #[serde(default)]
        discussion_id: Option<i64>,
        body: String,
    },
    ProjectUpdated {
        project_id: i64,
    },
    MemberAdded {
        project_id: i64,
        member_id: UserId,
    },
    TypingStart {
        project_id: i64,
        discussion_id: i64,
    },
    TypingStop {
        project_id: i64,
        discussion_id: i64,
    },
    UpdatePresence {
        status: PresenceStatus,
    },
}

impl ClientEvent {
    /// Wire name of this event (kebab-case, matches the serde tag).
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientEvent::JoinProject { .. } => "join-project",
            ClientEvent::LeaveProject { .. } => "leave-project",
            ClientEvent::TaskCreated { .. } => "task-created",
            ClientEvent::TaskUpdated { .. } => "task-updated",
            ClientEvent::NewMessage { .. } => "new-message",
            ClientEvent::ProjectUpdated { .. } => "project-updated",
            ClientEvent::MemberAdded { .. } => "member-added",
            ClientEvent::TypingStart { .. } => "typing-start",
            ClientEvent::TypingStop { .. } => "typing-stop",
            ClientEvent::UpdatePresence { .. } => "update-presence",
        }
    }

    /// Project id embedded in the event, if it targets one.
    pub fn project_id(&self) -> Option<i64> {
        match self {
            ClientEvent::JoinProject { project_id }
            | ClientEvent::LeaveProject { project_id }
            | ClientEvent::TaskCreated { project_id, .. }
            | ClientEvent::TaskUpdated { project_id, .. }
            | ClientEvent::NewMessage { project_id, .. }
            | ClientEvent::ProjectUpdated { project_id }
            | ClientEvent::MemberAdded { project_id, .. }
            | ClientEvent::TypingStart { project_id, .. }
            | ClientEvent::TypingStop { project_id, .. } => Some(*project_id),
            ClientEvent::UpdatePresence { .. } => None,
        }
    }
}

// =============================================================================
// OUTBOUND (hub → client)
// =============================================================================

/// Urgency tier of a deadline alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineTier {
    Approaching,
    EarlyReminder,
    Overdue,
}

impl DeadlineTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadlineTier::Approaching => "approaching",
            DeadlineTier::EarlyReminder => "early_reminder",
            DeadlineTier::Overdue => "overdue",
        }
    }
}

/// Event delivered to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Acknowledges a successful project-room join.
    ProjectJoined { project_id: i64 },
    /// Generic denial/failure signal. Never reveals whether an
    /// unauthorized resource exists.
    Error { message: String },
    UserOnline { user_id: UserId },
    UserOffline { user_id: UserId },
    UserPresenceChanged {
        user_id: UserId,
        status: PresenceStatus,
    },
    UserTyping {
        user_id: UserId,
        project_id: i64,
        discussion_id: i64,
        typing: bool,
    },
    TaskCreated {
        project_id: i64,
        task_id: i64,
        title: String,
        actor: UserId,
    },
    TaskUpdated {
        project_id: i64,
        task_id: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        actor: UserId,
    },
    NewMessage {
        project_id: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        discussion_id: Option<i64>,
        body: String,
        actor: UserId,
    },
    ProjectUpdated { project_id: i64, actor: UserId },
    MemberAdded {
        project_id: i64,
        member_id: UserId,
        actor: UserId,
    },
    /// Task deadline alert, delivered by the scheduler to the assignee's
    /// personal room and the project room.
    DeadlineAlert {
        entity_id: i64,
        title: String,
        deadline: NaiveDate,
        #[serde(rename = "type")]
        tier: DeadlineTier,
        timestamp: DateTime<Utc>,
    },
    /// Project deadline alert, delivered to the owner and project room.
    ProjectDeadlineAlert {
        entity_id: i64,
        title: String,
        deadline: NaiveDate,
        #[serde(rename = "type")]
        tier: DeadlineTier,
        timestamp: DateTime<Utc>,
    },
}

impl ServerEvent {
    /// Generic error frame. The message is deliberately uniform for
    /// authorization failures so "forbidden" and "not found" are
    /// indistinguishable to the client.
    pub fn denied() -> Self {
        ServerEvent::Error {
            message: "not available".to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    /// Wire name of this event (kebab-case, matches the serde tag).
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerEvent::ProjectJoined { .. } => "project-joined",
            ServerEvent::Error { .. } => "error",
            ServerEvent::UserOnline { .. } => "user-online",
            ServerEvent::UserOffline { .. } => "user-offline",
            ServerEvent::UserPresenceChanged { .. } => "user-presence-changed",
            ServerEvent::UserTyping { .. } => "user-typing",
            ServerEvent::TaskCreated { .. } => "task-created",
            ServerEvent::TaskUpdated { .. } => "task-updated",
            ServerEvent::NewMessage { .. } => "new-message",
            ServerEvent::ProjectUpdated { .. } => "project-updated",
            ServerEvent::MemberAdded { .. } => "member-added",
            ServerEvent::DeadlineAlert { .. } => "deadline-alert",
            ServerEvent::ProjectDeadlineAlert { .. } => "project-deadline-alert",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_join_project_deserializes() {
        let frame = r#"{"event":"join-project","data":{"projectId":42}}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        assert!(matches!(event, ClientEvent::JoinProject { project_id: 42 }));
        assert_eq!(event.event_name(), "join-project");
        assert_eq!(event.project_id(), Some(42));
    }

    #[test]
    fn test_client_event_task_updated_optional_fields() {
        let frame =
            r#"{"event":"task-updated","data":{"projectId":1,"taskId":9,"status":"done"}}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        match event {
            ClientEvent::TaskUpdated {
                project_id,
                task_id,
                status,
                title,
            } => {
                assert_eq!(project_id, 1);
                assert_eq!(task_id, 9);
                assert_eq!(status.as_deref(), Some("done"));
                assert!(title.is_none());
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_client_event_update_presence() {
        let frame = r#"{"event":"update-presence","data":{"status":"away"}}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        assert!(matches!(
            event,
            ClientEvent::UpdatePresence {
                status: PresenceStatus::Away
            }
        ));
        assert_eq!(event.project_id(), None);
    }

    #[test]
    fn test_client_event_unknown_event_is_rejected() {
        let frame = r#"{"event":"drop-tables","data":{}}"#;
        assert!(serde_json::from_str::<ClientEvent>(frame).is_err());
    }

    #[test]
    fn test_client_event_missing_required_field_is_rejected() {
        // new-message without a body is malformed
        let frame = r#"{"event":"new-message","data":{"projectId":3}}"#;
        assert!(serde_json::from_str::<ClientEvent>(frame).is_err());
    }

    #[test]
    fn test_server_event_serializes_kebab_and_camel() {
        let event = ServerEvent::TaskUpdated {
            project_id: 5,
            task_id: 11,
            status: Some("in_progress".to_string()),
            title: None,
            actor: 2,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event":"task-updated"#));
        assert!(json.contains(r#""projectId":5"#));
        assert!(json.contains(r#""taskId":11"#));
        // None fields are skipped entirely
        assert!(!json.contains("title"));
    }

    #[test]
    fn test_server_event_deadline_alert_payload_shape() {
        let event = ServerEvent::DeadlineAlert {
            entity_id: 7,
            title: "Ship release".to_string(),
            deadline: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            tier: DeadlineTier::Overdue,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "deadline-alert");
        assert_eq!(json["data"]["entityId"], 7);
        assert_eq!(json["data"]["type"], "overdue");
        assert!(json["data"]["timestamp"].is_string());
    }

    #[test]
    fn test_denied_error_is_uniform() {
        // Denial must not distinguish forbidden from not-found.
        let a = serde_json::to_string(&ServerEvent::denied()).unwrap();
        let b = serde_json::to_string(&ServerEvent::denied()).unwrap();
        assert_eq!(a, b);
        assert!(a.contains(r#""event":"error"#));
    }

    #[test]
    fn test_server_event_names_exhaustive_for_protocol_table() {
        assert_eq!(
            ServerEvent::ProjectJoined { project_id: 0 }.event_name(),
            "project-joined"
        );
        assert_eq!(
            ServerEvent::UserPresenceChanged {
                user_id: 0,
                status: PresenceStatus::Busy
            }
            .event_name(),
            "user-presence-changed"
        );
        assert_eq!(
            ServerEvent::ProjectDeadlineAlert {
                entity_id: 0,
                title: String::new(),
                deadline: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                tier: DeadlineTier::Approaching,
                timestamp: Utc::now(),
            }
            .event_name(),
            "project-deadline-alert"
        );
    }
}
