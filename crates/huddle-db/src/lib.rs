//! # huddle-db
//!
//! PostgreSQL database layer for huddle.
//!
//! This crate provides:
//! - Connection pool management
//! - Token-based identity resolution
//! - The access gate over project membership rows
//! - Notification persistence
//! - Deadline sweep queries for the scheduler
//!
//! ## Example
//!
//! ```rust,ignore
//! use huddle_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/huddle").await?;
//!
//!     let role = db.access.project_role(7, 42).await?;
//!     println!("role: {role:?}");
//!     Ok(())
//! }
//! ```
pub mod access;
pub mod deadlines;
pub mod identity;
pub mod notifications;
pub mod pool;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use huddle_core::*;

// Re-export repository implementations
pub use access::PgAccessGate;
pub use deadlines::PgDeadlineRepository;
pub use identity::PgTokenIdentity;
pub use notifications::PgNotificationRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Authorization lookups for rooms and tasks.
    pub access: PgAccessGate,
    /// Token-to-user identity resolution.
    pub identity: PgTokenIdentity,
    /// Notification persistence.
    pub notifications: PgNotificationRepository,
    /// Deadline sweep queries.
    pub deadlines: PgDeadlineRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            access: PgAccessGate::new(pool.clone()),
            identity: PgTokenIdentity::new(pool.clone()),
            notifications: PgNotificationRepository::new(pool.clone()),
            deadlines: PgDeadlineRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the database and create all repositories.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::new(pool))
    }
}
