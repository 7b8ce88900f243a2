//! Deadline sweep queries over tasks and projects.
//!
//! Rows come back denormalized (assignee, project name) so the scheduler
//! can build notifications without follow-up reads.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres, Row};

use huddle_core::{DeadlineRepository, DueProject, DueTask, Error, Result};

/// PostgreSQL deadline repository.
#[derive(Clone)]
pub struct PgDeadlineRepository {
    pool: Pool<Postgres>,
}

impl PgDeadlineRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_task(r: &sqlx::postgres::PgRow) -> DueTask {
        DueTask {
            id: r.get("id"),
            title: r.get("title"),
            due_date: r.get("due_date"),
            assignee_id: r.get("assignee_id"),
            project_id: r.get("project_id"),
            project_name: r.get("project_name"),
        }
    }

    fn parse_project(r: &sqlx::postgres::PgRow) -> DueProject {
        DueProject {
            id: r.get("id"),
            name: r.get("name"),
            deadline: r.get("deadline"),
            owner_id: r.get("owner_id"),
        }
    }
}

#[async_trait]
impl DeadlineRepository for PgDeadlineRepository {
    async fn tasks_due_within(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DueTask>> {
        let rows = sqlx::query(
            "SELECT t.id, t.title, t.due_date, t.assignee_id, t.project_id,
                    p.name AS project_name
             FROM tasks t
             JOIN projects p ON p.id = t.project_id
             WHERE t.due_date BETWEEN $1 AND $2
               AND t.status <> 'done'
             ORDER BY t.due_date",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::parse_task).collect())
    }

    async fn tasks_overdue(&self, today: NaiveDate) -> Result<Vec<DueTask>> {
        let rows = sqlx::query(
            "SELECT t.id, t.title, t.due_date, t.assignee_id, t.project_id,
                    p.name AS project_name
             FROM tasks t
             JOIN projects p ON p.id = t.project_id
             WHERE t.due_date < $1
               AND t.status <> 'done'
             ORDER BY t.due_date",
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::parse_task).collect())
    }

    async fn projects_due_within(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DueProject>> {
        let rows = sqlx::query(
            "SELECT id, name, deadline, owner_id
             FROM projects
             WHERE deadline BETWEEN $1 AND $2
               AND status <> 'completed'
             ORDER BY deadline",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::parse_project).collect())
    }

    async fn projects_overdue(&self, today: NaiveDate) -> Result<Vec<DueProject>> {
        let rows = sqlx::query(
            "SELECT id, name, deadline, owner_id
             FROM projects
             WHERE deadline < $1
               AND status <> 'completed'
             ORDER BY deadline",
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::parse_project).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::connect_test_pool;

    #[tokio::test]
    #[ignore = "requires a live database"]
    async fn test_sweep_queries_execute() {
        let repo = PgDeadlineRepository::new(connect_test_pool().await);
        let today = chrono::Utc::now().date_naive();

        // Shape checks only: the fixture database decides row counts.
        repo.tasks_due_within(today, today + chrono::Duration::days(2))
            .await
            .unwrap();
        repo.tasks_overdue(today).await.unwrap();
        repo.projects_due_within(today, today + chrono::Duration::days(2))
            .await
            .unwrap();
        repo.projects_overdue(today).await.unwrap();
    }
}
