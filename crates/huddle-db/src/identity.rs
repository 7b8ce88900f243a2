//! Token-based identity provider.
//!
//! Resolves an opaque API token to a verified user id. The hub trusts the
//! returned identity for the lifetime of a connection; revocation takes
//! effect on the next connect.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use huddle_core::{Error, IdentityProvider, Result, UserId};

/// PostgreSQL-backed identity provider over the `api_tokens` table.
#[derive(Clone)]
pub struct PgTokenIdentity {
    pool: Pool<Postgres>,
}

impl PgTokenIdentity {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityProvider for PgTokenIdentity {
    async fn authenticate(&self, credential: &str) -> Result<UserId> {
        if credential.is_empty() {
            return Err(Error::Unauthenticated("missing token".to_string()));
        }

        let row = sqlx::query(
            "SELECT user_id
             FROM api_tokens
             WHERE token = $1
               AND (expires_at IS NULL OR expires_at > now())",
        )
        .bind(credential)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(r) => {
                let user_id: UserId = r.get("user_id");
                debug!(subsystem = "db", component = "identity", user_id, "token verified");
                Ok(user_id)
            }
            None => Err(Error::Unauthenticated("invalid token".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::connect_test_pool;

    #[tokio::test]
    #[ignore = "requires a live database"]
    async fn test_empty_and_unknown_tokens_are_rejected() {
        let identity = PgTokenIdentity::new(connect_test_pool().await);

        assert!(matches!(
            identity.authenticate("").await,
            Err(Error::Unauthenticated(_))
        ));
        assert!(matches!(
            identity.authenticate("no-such-token").await,
            Err(Error::Unauthenticated(_))
        ));
    }
}
