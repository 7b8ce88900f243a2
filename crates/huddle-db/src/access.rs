//! Access gate backed by project membership rows.
//!
//! One authorization surface for room admission and per-event
//! re-validation. Both lookups collapse "no such resource" and "not a
//! member" into `None` so callers cannot leak existence.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use huddle_core::{AccessGate, Error, ProjectRole, Result, TaskContext, UserId};

/// PostgreSQL access gate.
#[derive(Clone)]
pub struct PgAccessGate {
    pool: Pool<Postgres>,
}

impl PgAccessGate {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn role_from_row(user_id: UserId, owner_id: UserId, role: Option<String>) -> Option<ProjectRole> {
        // The creator is always owner, membership row or not.
        if owner_id == user_id {
            return Some(ProjectRole::Owner);
        }
        role.as_deref().and_then(ProjectRole::parse)
    }
}

#[async_trait]
impl AccessGate for PgAccessGate {
    async fn project_role(
        &self,
        user_id: UserId,
        project_id: i64,
    ) -> Result<Option<ProjectRole>> {
        let row = sqlx::query(
            "SELECT p.owner_id, pm.role
             FROM projects p
             LEFT JOIN project_members pm
               ON pm.project_id = p.id AND pm.user_id = $2
             WHERE p.id = $1",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.and_then(|r| Self::role_from_row(user_id, r.get("owner_id"), r.get("role"))))
    }

    async fn task_access(&self, user_id: UserId, task_id: i64) -> Result<Option<TaskContext>> {
        let row = sqlx::query(
            "SELECT t.project_id, p.owner_id, pm.role
             FROM tasks t
             JOIN projects p ON p.id = t.project_id
             LEFT JOIN project_members pm
               ON pm.project_id = t.project_id AND pm.user_id = $2
             WHERE t.id = $1",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.and_then(|r| {
            let project_id: i64 = r.get("project_id");
            Self::role_from_row(user_id, r.get("owner_id"), r.get("role")).map(|role| {
                TaskContext {
                    task_id,
                    project_id,
                    role,
                }
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::connect_test_pool;

    #[test]
    fn test_creator_is_always_owner() {
        // No membership row, but owner_id matches.
        assert_eq!(
            PgAccessGate::role_from_row(7, 7, None),
            Some(ProjectRole::Owner)
        );
        // Even a conflicting membership row loses to creator status.
        assert_eq!(
            PgAccessGate::role_from_row(7, 7, Some("member".to_string())),
            Some(ProjectRole::Owner)
        );
    }

    #[test]
    fn test_non_member_is_denied() {
        assert_eq!(PgAccessGate::role_from_row(3, 7, None), None);
        // Unknown role strings deny rather than default
        assert_eq!(
            PgAccessGate::role_from_row(3, 7, Some("superuser".to_string())),
            None
        );
    }

    #[test]
    fn test_membership_row_roles() {
        assert_eq!(
            PgAccessGate::role_from_row(3, 7, Some("admin".to_string())),
            Some(ProjectRole::Admin)
        );
        assert_eq!(
            PgAccessGate::role_from_row(3, 7, Some("member".to_string())),
            Some(ProjectRole::Member)
        );
    }

    #[tokio::test]
    #[ignore = "requires a live database"]
    async fn test_project_role_against_live_db() {
        let pool = connect_test_pool().await;
        let gate = PgAccessGate::new(pool);
        // Nonexistent project looks identical to denied membership.
        let role = gate.project_role(1, i64::MAX).await.unwrap();
        assert_eq!(role, None);
    }
}
