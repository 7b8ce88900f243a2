//! Notification persistence.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use huddle_core::{
    Error, NewNotification, Notification, NotificationKind, NotificationRepository, Result, UserId,
};

/// PostgreSQL notification repository.
#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: Pool<Postgres>,
}

impl PgNotificationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(r: &sqlx::postgres::PgRow) -> Notification {
        let kind: String = r.get("kind");
        Notification {
            id: r.get("id"),
            user_id: r.get("user_id"),
            title: r.get("title"),
            body: r.get("body"),
            // Unknown kinds in old rows fall back to the generic bucket.
            kind: NotificationKind::parse(&kind).unwrap_or(NotificationKind::StatusChange),
            project_id: r.get("project_id"),
            task_id: r.get("task_id"),
            is_read: r.get("is_read"),
            created_at: r.get("created_at"),
        }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn insert(&self, notification: NewNotification) -> Result<Uuid> {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO notifications
                 (id, user_id, title, body, kind, project_id, task_id, is_read, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, false, $8)",
        )
        .bind(id)
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(notification.kind.as_str())
        .bind(notification.project_id)
        .bind(notification.task_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(id)
    }

    async fn list_for_user(&self, user_id: UserId, limit: i64) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, body, kind, project_id, task_id, is_read, created_at
             FROM notifications
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::parse_row).collect())
    }

    async fn mark_read(&self, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE notifications SET is_read = true WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn unread_count(&self, user_id: UserId) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.get("count"))
    }
}
