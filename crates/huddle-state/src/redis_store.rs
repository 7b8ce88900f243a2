//! Redis-backed ephemeral store.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `REDIS_ENABLED`: Set to "false" to disable the store (default: true)
//! - `REDIS_URL`: Redis connection URL (default: redis://localhost:6379)
//!
//! When disabled or unreachable, every operation degrades to a miss/false
//! so callers recompute from source data. A failed connection at startup
//! is logged and tolerated; the hub keeps serving without presence and
//! caching rather than refusing to start.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use huddle_core::EphemeralStore;

/// Ephemeral store backed by Redis.
#[derive(Clone)]
pub struct RedisStore {
    inner: Arc<RedisStoreInner>,
}

struct RedisStoreInner {
    /// Redis connection manager (None if disabled or unreachable).
    connection: RwLock<Option<ConnectionManager>>,
    /// Whether the store is enabled.
    enabled: bool,
}

impl RedisStore {
    /// Create a store from environment configuration.
    ///
    /// Reads:
    /// - `REDIS_ENABLED` (default: true)
    /// - `REDIS_URL` (default: redis://localhost:6379)
    pub async fn from_env() -> Self {
        let enabled = std::env::var("REDIS_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let connection = if enabled {
            match redis::Client::open(redis_url.as_str()) {
                Ok(client) => match ConnectionManager::new(client).await {
                    Ok(conn) => {
                        info!(subsystem = "state", "Redis ephemeral store connected");
                        Some(conn)
                    }
                    Err(e) => {
                        warn!(
                            subsystem = "state",
                            error = %e,
                            "Failed to connect to Redis, ephemeral store degraded"
                        );
                        None
                    }
                },
                Err(e) => {
                    warn!(subsystem = "state", error = %e, "Invalid Redis URL, ephemeral store degraded");
                    None
                }
            }
        } else {
            info!(
                subsystem = "state",
                "Redis ephemeral store disabled via REDIS_ENABLED=false"
            );
            None
        };

        Self {
            inner: Arc::new(RedisStoreInner {
                connection: RwLock::new(connection),
                enabled,
            }),
        }
    }

    /// Create a disabled store (for testing or when Redis is unavailable).
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(RedisStoreInner {
                connection: RwLock::new(None),
                enabled: false,
            }),
        }
    }

    /// Whether the store is enabled and connected.
    pub async fn is_connected(&self) -> bool {
        self.inner.enabled && self.inner.connection.read().await.is_some()
    }
}

/// Run one command against the managed connection, degrading to `default`
/// on absence or error.
macro_rules! with_conn {
    ($self:ident, $default:expr, $op:literal, |$conn:ident| $body:expr) => {{
        let mut guard = $self.inner.connection.write().await;
        match guard.as_mut() {
            Some($conn) => match $body {
                Ok(v) => v,
                Err(e) => {
                    error!(subsystem = "state", op = $op, error = %e, "Redis command failed");
                    $default
                }
            },
            None => $default,
        }
    }};
}

#[async_trait]
impl EphemeralStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        with_conn!(self, false, "set", |conn| {
            match ttl {
                Some(d) => conn
                    .set_ex::<_, _, ()>(key, value, d.as_secs().max(1))
                    .await
                    .map(|_| true),
                None => conn.set::<_, _, ()>(key, value).await.map(|_| true),
            }
        })
    }

    async fn get(&self, key: &str) -> Option<String> {
        with_conn!(self, None, "get", |conn| conn
            .get::<_, Option<String>>(key)
            .await)
    }

    async fn del(&self, key: &str) -> bool {
        with_conn!(self, false, "del", |conn| conn
            .del::<_, i64>(key)
            .await
            .map(|n| n > 0))
    }

    async fn exists(&self, key: &str) -> bool {
        with_conn!(self, false, "exists", |conn| conn
            .exists::<_, bool>(key)
            .await)
    }

    async fn incr(&self, key: &str) -> Option<i64> {
        with_conn!(self, None, "incr", |conn| conn
            .incr::<_, _, i64>(key, 1)
            .await
            .map(Some))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> bool {
        with_conn!(self, false, "expire", |conn| conn
            .expire::<_, bool>(key, ttl.as_secs().max(1) as i64)
            .await)
    }

    async fn sadd(&self, key: &str, member: &str) -> bool {
        with_conn!(self, false, "sadd", |conn| conn
            .sadd::<_, _, i64>(key, member)
            .await
            .map(|n| n > 0))
    }

    async fn smembers(&self, key: &str) -> Vec<String> {
        with_conn!(self, Vec::new(), "smembers", |conn| conn
            .smembers::<_, Vec<String>>(key)
            .await)
    }

    async fn srem(&self, key: &str, member: &str) -> bool {
        with_conn!(self, false, "srem", |conn| conn
            .srem::<_, _, i64>(key, member)
            .await
            .map(|n| n > 0))
    }

    async fn lpush_front(&self, key: &str, value: &str) -> bool {
        with_conn!(self, false, "lpush", |conn| conn
            .lpush::<_, _, i64>(key, value)
            .await
            .map(|_| true))
    }

    async fn ltrim(&self, key: &str, max_len: usize) -> bool {
        with_conn!(self, false, "ltrim", |conn| conn
            .ltrim::<_, ()>(key, 0, max_len as isize - 1)
            .await
            .map(|_| true))
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Vec<String> {
        with_conn!(self, Vec::new(), "lrange", |conn| conn
            .lrange::<_, Vec<String>>(key, start as isize, stop as isize)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_store_degrades_everywhere() {
        let store = RedisStore::disabled();
        assert!(!store.is_connected().await);
        assert!(!store.set("k", "v", None).await);
        assert_eq!(store.get("k").await, None);
        assert!(!store.exists("k").await);
        assert_eq!(store.incr("k").await, None);
        assert!(store.smembers("k").await.is_empty());
        assert!(store.lrange("k", 0, -1).await.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis instance"]
    async fn test_live_redis_round_trip() {
        std::env::set_var("REDIS_URL", "redis://localhost:6379");
        let store = RedisStore::from_env().await;
        assert!(store.is_connected().await);

        let key = format!("huddle:test:{}", uuid_suffix());
        assert!(store.set(&key, "v", Some(Duration::from_secs(5))).await);
        assert_eq!(store.get(&key).await.as_deref(), Some("v"));
        assert!(store.del(&key).await);
        assert!(!store.exists(&key).await);
    }

    fn uuid_suffix() -> u128 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    }
}
