//! Core traits for the huddle hub's seams.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends (Postgres, Redis, in-memory) and
//! hermetic testing of the hub and scheduler.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    DueProject, DueTask, NewNotification, Notification, ProjectRole, TaskContext, UserId,
};

// =============================================================================
// ACCESS GATE
// =============================================================================

/// Single authorization interface for room admission and per-event
/// re-validation.
///
/// Both methods return `Ok(None)` for "not found" AND "not a member" —
/// deliberately indistinguishable so callers cannot leak resource
/// existence to unauthorized users.
#[async_trait]
pub trait AccessGate: Send + Sync {
    /// Role the user holds in the project, if any. The project creator is
    /// always `Owner` regardless of an explicit membership row.
    async fn project_role(&self, user_id: UserId, project_id: i64)
        -> Result<Option<ProjectRole>>;

    /// Authorization context for a task-scoped event: resolves the task's
    /// project and the user's role there.
    async fn task_access(&self, user_id: UserId, task_id: i64) -> Result<Option<TaskContext>>;
}

// =============================================================================
// EPHEMERAL STATE STORE
// =============================================================================

/// Key/value + set + list store with per-key expiry.
///
/// Used for presence, dedup markers, cached project snapshots, and bounded
/// recent-activity lists. Every operation is independently atomic per key;
/// no cross-key transactions. On store unavailability operations return
/// degraded results (`false`, `None`, empty) and log — callers fall back
/// to source-of-truth computation rather than crash.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Set a key, optionally with a TTL. Returns false on store failure.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool;

    /// Get a key. `None` means absent, expired, or store failure.
    async fn get(&self, key: &str) -> Option<String>;

    /// Delete a key. Returns whether a key was removed.
    async fn del(&self, key: &str) -> bool;

    /// Whether the key currently exists (and has not expired).
    async fn exists(&self, key: &str) -> bool;

    /// Increment an integer key, creating it at 1 if absent.
    /// `None` on store failure or non-integer value.
    async fn incr(&self, key: &str) -> Option<i64>;

    /// Set/refresh the TTL of an existing key. False if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> bool;

    /// Add a member to a set. Returns whether the member was newly added.
    async fn sadd(&self, key: &str, member: &str) -> bool;

    /// All members of a set (empty on absence or failure).
    async fn smembers(&self, key: &str) -> Vec<String>;

    /// Remove a member from a set. Returns whether it was present.
    async fn srem(&self, key: &str, member: &str) -> bool;

    /// Insert a value at the head of a list.
    async fn lpush_front(&self, key: &str, value: &str) -> bool;

    /// Truncate a list to at most `max_len` entries, keeping the head.
    async fn ltrim(&self, key: &str, max_len: usize) -> bool;

    /// Range of list entries, inclusive indices (redis semantics:
    /// `0, -1` is the whole list).
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Vec<String>;
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Verifies a transport-level credential and yields a user identity.
///
/// The hub trusts the returned identity for the lifetime of a connection.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the verified user id, or `Error::Unauthenticated`.
    async fn authenticate(&self, credential: &str) -> Result<UserId>;
}

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Notification persistence, consumed by the deadline scheduler and
/// exposed for read-state management.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert a new notification, returning its id.
    async fn insert(&self, notification: NewNotification) -> Result<Uuid>;

    /// Most recent notifications for a user.
    async fn list_for_user(&self, user_id: UserId, limit: i64) -> Result<Vec<Notification>>;

    /// Mark the given notifications as read.
    async fn mark_read(&self, ids: &[Uuid]) -> Result<()>;

    /// Count of unread notifications for a user.
    async fn unread_count(&self, user_id: UserId) -> Result<i64>;
}

/// Deadline sweep queries over tasks and projects.
///
/// All queries exclude completed work; "overdue" means strictly before
/// `today`, "due within" is an inclusive date window.
#[async_trait]
pub trait DeadlineRepository: Send + Sync {
    async fn tasks_due_within(
        &self,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> Result<Vec<DueTask>>;

    async fn tasks_overdue(&self, today: chrono::NaiveDate) -> Result<Vec<DueTask>>;

    async fn projects_due_within(
        &self,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> Result<Vec<DueProject>>;

    async fn projects_overdue(&self, today: chrono::NaiveDate) -> Result<Vec<DueProject>>;
}
