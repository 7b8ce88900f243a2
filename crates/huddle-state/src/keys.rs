//! Key shapes for everything the hub writes to the ephemeral store.
//!
//! Kept in one place so the contract in the data model stays greppable:
//! `presence:<userId>`, `overdue:<type>:<id>:<date>`, `project:<id>`,
//! `activity:<projectId>`.

use chrono::NaiveDate;
use huddle_core::UserId;

/// Presence entry for a user. Absence of the key means offline.
pub fn presence(user_id: UserId) -> String {
    format!("presence:{user_id}")
}

/// Per-day dedup marker for overdue notifications.
pub fn overdue_marker(entity_type: &str, entity_id: i64, date: NaiveDate) -> String {
    format!("overdue:{entity_type}:{entity_id}:{date}")
}

/// Per-day dedup marker for approaching-deadline reminders.
pub fn due_marker(entity_type: &str, entity_id: i64, date: NaiveDate) -> String {
    format!("due:{entity_type}:{entity_id}:{date}")
}

/// Denormalized project snapshot cache.
pub fn project_snapshot(project_id: i64) -> String {
    format!("project:{project_id}")
}

/// Bounded recent-activity list for a project.
pub fn activity(project_id: i64) -> String {
    format!("activity:{project_id}")
}
