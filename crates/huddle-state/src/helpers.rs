//! Typed helpers over the raw ephemeral-store contract.

use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use huddle_core::{defaults, ActivityEntry, EphemeralStore};

use crate::keys;

/// Cache of denormalized project views.
///
/// Staleness within the TTL is tolerated; any write to a project's
/// members, tasks, or metadata must call [`ProjectSnapshotCache::invalidate`]
/// before the next read can observe stale data beyond the TTL.
#[derive(Clone)]
pub struct ProjectSnapshotCache {
    store: Arc<dyn EphemeralStore>,
    ttl: Duration,
}

impl ProjectSnapshotCache {
    pub fn new(store: Arc<dyn EphemeralStore>) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(defaults::PROJECT_SNAPSHOT_TTL_SECS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Cached snapshot, or `None` on miss/expiry/store failure — the
    /// caller recomputes from the relational store in that case.
    pub async fn get<T: DeserializeOwned>(&self, project_id: i64) -> Option<T> {
        let raw = self.store.get(&keys::project_snapshot(project_id)).await?;
        match serde_json::from_str(&raw) {
            Ok(v) => {
                debug!(subsystem = "state", component = "snapshot", project_id, "cache hit");
                Some(v)
            }
            Err(e) => {
                warn!(
                    subsystem = "state",
                    component = "snapshot",
                    project_id,
                    error = %e,
                    "discarding undecodable snapshot"
                );
                None
            }
        }
    }

    pub async fn put<T: Serialize>(&self, project_id: i64, snapshot: &T) -> bool {
        let raw = match serde_json::to_string(snapshot) {
            Ok(s) => s,
            Err(e) => {
                warn!(subsystem = "state", component = "snapshot", error = %e, "snapshot serialization failed");
                return false;
            }
        };
        self.store
            .set(&keys::project_snapshot(project_id), &raw, Some(self.ttl))
            .await
    }

    /// Delete the snapshot. Called on every write to the project's
    /// members, tasks, or metadata.
    pub async fn invalidate(&self, project_id: i64) -> bool {
        debug!(
            subsystem = "state",
            component = "snapshot",
            project_id,
            op = "invalidate",
            "snapshot invalidated"
        );
        self.store.del(&keys::project_snapshot(project_id)).await
    }
}

/// Bounded per-project recent-activity list.
///
/// Push-and-trim: insert at head, truncate to the max length, refresh the
/// TTL on every write.
#[derive(Clone)]
pub struct ActivityLog {
    store: Arc<dyn EphemeralStore>,
    max_entries: usize,
    ttl: Duration,
}

impl ActivityLog {
    pub fn new(store: Arc<dyn EphemeralStore>) -> Self {
        Self {
            store,
            max_entries: defaults::ACTIVITY_LOG_MAX_ENTRIES,
            ttl: Duration::from_secs(defaults::ACTIVITY_LOG_TTL_SECS),
        }
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Record one entry. Best-effort: a store failure is logged by the
    /// store itself and the event flow continues.
    pub async fn record(&self, project_id: i64, entry: &ActivityEntry) {
        let raw = match serde_json::to_string(entry) {
            Ok(s) => s,
            Err(e) => {
                warn!(subsystem = "state", component = "activity", error = %e, "activity entry serialization failed");
                return;
            }
        };
        let key = keys::activity(project_id);
        self.store.lpush_front(&key, &raw).await;
        self.store.ltrim(&key, self.max_entries).await;
        self.store.expire(&key, self.ttl).await;
    }

    /// Most recent entries, newest first. Undecodable entries are skipped.
    pub async fn recent(&self, project_id: i64, limit: usize) -> Vec<ActivityEntry> {
        let raw = self
            .store
            .lrange(&keys::activity(project_id), 0, limit as i64 - 1)
            .await;
        raw.iter()
            .filter_map(|s| serde_json::from_str(s).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        name: String,
        task_count: i64,
    }

    fn store() -> Arc<dyn EphemeralStore> {
        Arc::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_and_invalidate() {
        let cache = ProjectSnapshotCache::new(store());
        let snap = Snapshot {
            name: "apollo".to_string(),
            task_count: 12,
        };

        assert!(cache.put(42, &snap).await);
        assert_eq!(cache.get::<Snapshot>(42).await, Some(snap));

        assert!(cache.invalidate(42).await);
        assert_eq!(cache.get::<Snapshot>(42).await, None);
    }

    #[tokio::test]
    async fn test_snapshot_expires_with_ttl() {
        let cache =
            ProjectSnapshotCache::new(store()).with_ttl(Duration::from_millis(30));
        cache
            .put(
                1,
                &Snapshot {
                    name: "x".to_string(),
                    task_count: 0,
                },
            )
            .await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get::<Snapshot>(1).await, None);
    }

    #[tokio::test]
    async fn test_activity_log_push_and_trim() {
        let log = ActivityLog::new(store()).with_max_entries(3);

        for i in 0..5 {
            log.record(7, &ActivityEntry::new("task", i, format!("edit {i}")))
                .await;
        }

        let recent = log.recent(7, 10).await;
        assert_eq!(recent.len(), 3);
        // Newest first
        assert_eq!(recent[0].actor, 4);
        assert_eq!(recent[2].actor, 2);
    }

    #[tokio::test]
    async fn test_activity_log_skips_undecodable_entries() {
        let backing = store();
        let log = ActivityLog::new(backing.clone());

        backing.lpush_front("activity:9", "not json").await;
        log.record(9, &ActivityEntry::new("member", 1, "joined"))
            .await;

        let recent = log.recent(9, 10).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].kind, "member");
    }
}
