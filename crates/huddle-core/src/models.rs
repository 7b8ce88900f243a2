//! Shared domain models for the huddle hub.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User identifier as issued by the identity provider.
pub type UserId = i64;

// =============================================================================
// ROOMS
// =============================================================================

/// Key of a broadcast room.
///
/// Personal rooms (`user:<id>`) exist implicitly, exactly one per user, and
/// are never explicitly destroyed. Project rooms (`project:<id>`) are joined
/// and left dynamically, gated by project authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKey {
    /// Personal room, scoped to the owning user's connections only.
    User(UserId),
    /// Project room, membership gated by the access gate.
    Project(i64),
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomKey::User(id) => write!(f, "user:{id}"),
            RoomKey::Project(id) => write!(f, "project:{id}"),
        }
    }
}

// =============================================================================
// AUTHORIZATION
// =============================================================================

/// Role a user holds within a project.
///
/// Ordered: `Member < Admin < Owner`. The project creator is always
/// `Owner` regardless of an explicit membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Member,
    Admin,
    Owner,
}

impl ProjectRole {
    /// Parse the role string stored in the membership table.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(ProjectRole::Member),
            "admin" => Some(ProjectRole::Admin),
            "owner" => Some(ProjectRole::Owner),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Member => "member",
            ProjectRole::Admin => "admin",
            ProjectRole::Owner => "owner",
        }
    }
}

/// Authorization context for a task-scoped event: which project the task
/// belongs to and the sender's role there.
#[derive(Debug, Clone, Copy)]
pub struct TaskContext {
    pub task_id: i64,
    pub project_id: i64,
    pub role: ProjectRole,
}

// =============================================================================
// PRESENCE
// =============================================================================

/// Ephemeral liveness/status state for a user.
///
/// Stored under `presence:<userId>` with a short TTL; absence of the key
/// is equivalent to `Offline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Active,
    Away,
    Busy,
    Offline,
}

impl PresenceStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PresenceStatus::Active),
            "away" => Some(PresenceStatus::Away),
            "busy" => Some(PresenceStatus::Busy),
            "offline" => Some(PresenceStatus::Offline),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Active => "active",
            PresenceStatus::Away => "away",
            PresenceStatus::Busy => "busy",
            PresenceStatus::Offline => "offline",
        }
    }

    /// Whether this status counts as online for liveness queries.
    pub fn is_online(&self) -> bool {
        !matches!(self, PresenceStatus::Offline)
    }
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Category of a persisted notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Assigned,
    Approaching,
    Overdue,
    StatusChange,
    Comment,
    MemberAdded,
}

impl NotificationKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assigned" => Some(NotificationKind::Assigned),
            "approaching" => Some(NotificationKind::Approaching),
            "overdue" => Some(NotificationKind::Overdue),
            "status_change" => Some(NotificationKind::StatusChange),
            "comment" => Some(NotificationKind::Comment),
            "member_added" => Some(NotificationKind::MemberAdded),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Assigned => "assigned",
            NotificationKind::Approaching => "approaching",
            NotificationKind::Overdue => "overdue",
            NotificationKind::StatusChange => "status_change",
            NotificationKind::Comment => "comment",
            NotificationKind::MemberAdded => "member_added",
        }
    }
}

/// Persisted notification record. Created by the deadline scheduler (and
/// other producers); mutated only by read-state toggles.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    pub project_id: Option<i64>,
    pub task_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for inserting a new notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    pub project_id: Option<i64>,
    pub task_id: Option<i64>,
}

// =============================================================================
// DEADLINE SWEEP ROWS
// =============================================================================

/// Task row returned by the deadline sweep queries, denormalized with
/// assignee and project context so the scheduler needs no follow-up reads.
#[derive(Debug, Clone)]
pub struct DueTask {
    pub id: i64,
    pub title: String,
    pub due_date: NaiveDate,
    pub assignee_id: Option<UserId>,
    pub project_id: i64,
    pub project_name: String,
}

/// Project row returned by the deadline sweep queries.
#[derive(Debug, Clone)]
pub struct DueProject {
    pub id: i64,
    pub name: String,
    pub deadline: NaiveDate,
    pub owner_id: UserId,
}

// =============================================================================
// ACTIVITY LOG
// =============================================================================

/// One entry in a project's bounded recent-activity list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Event category ("task", "message", "project", "member").
    #[serde(rename = "type")]
    pub kind: String,
    /// User who performed the action.
    pub actor: UserId,
    /// Short human-readable action ("updated task 7", "joined").
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(kind: impl Into<String>, actor: UserId, action: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            actor,
            action: action.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_key_display() {
        assert_eq!(RoomKey::User(7).to_string(), "user:7");
        assert_eq!(RoomKey::Project(42).to_string(), "project:42");
    }

    #[test]
    fn test_role_ordering() {
        assert!(ProjectRole::Member < ProjectRole::Admin);
        assert!(ProjectRole::Admin < ProjectRole::Owner);
        assert!(ProjectRole::Owner >= ProjectRole::Member);
    }

    #[test]
    fn test_role_parse_round_trip() {
        for role in [ProjectRole::Member, ProjectRole::Admin, ProjectRole::Owner] {
            assert_eq!(ProjectRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(ProjectRole::parse("superuser"), None);
    }

    #[test]
    fn test_presence_status_is_online() {
        assert!(PresenceStatus::Active.is_online());
        assert!(PresenceStatus::Away.is_online());
        assert!(PresenceStatus::Busy.is_online());
        assert!(!PresenceStatus::Offline.is_online());
    }

    #[test]
    fn test_notification_kind_parse() {
        assert_eq!(
            NotificationKind::parse("status_change"),
            Some(NotificationKind::StatusChange)
        );
        assert_eq!(NotificationKind::parse("unknown"), None);
    }

    #[test]
    fn test_activity_entry_json_uses_type_field() {
        let entry = ActivityEntry::new("task", 3, "updated task 9");
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""type":"task"#));
        assert!(json.contains(r#""actor":3"#));
    }
}
