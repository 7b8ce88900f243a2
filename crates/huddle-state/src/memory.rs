//! In-process ephemeral store.
//!
//! Same contract as the Redis backend, including per-key TTL semantics:
//! expired entries are reaped lazily on access, so a key that outlives its
//! TTL is indistinguishable from one that never existed.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use huddle_core::EphemeralStore;

enum Value {
    Str(String),
    Set(HashSet<String>),
    List(VecDeque<String>),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-memory [`EphemeralStore`] with per-entry expiry.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a live (non-expired) entry, reaping it if the TTL lapsed.
    fn live<'a>(map: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        if map.get(key).is_some_and(Entry::expired) {
            map.remove(key);
            return None;
        }
        map.get_mut(key)
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        let mut map = self.entries.lock().await;
        map.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        true
    }

    async fn get(&self, key: &str) -> Option<String> {
        let mut map = self.entries.lock().await;
        match Self::live(&mut map, key)? {
            Entry {
                value: Value::Str(s),
                ..
            } => Some(s.clone()),
            _ => None,
        }
    }

    async fn del(&self, key: &str) -> bool {
        let mut map = self.entries.lock().await;
        match map.remove(key) {
            Some(entry) => !entry.expired(),
            None => false,
        }
    }

    async fn exists(&self, key: &str) -> bool {
        let mut map = self.entries.lock().await;
        Self::live(&mut map, key).is_some()
    }

    async fn incr(&self, key: &str) -> Option<i64> {
        let mut map = self.entries.lock().await;
        match Self::live(&mut map, key) {
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => {
                let next = s.parse::<i64>().ok()? + 1;
                *s = next.to_string();
                Some(next)
            }
            Some(_) => None,
            None => {
                map.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Str("1".to_string()),
                        expires_at: None,
                    },
                );
                Some(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> bool {
        let mut map = self.entries.lock().await;
        match Self::live(&mut map, key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                true
            }
            None => false,
        }
    }

    async fn sadd(&self, key: &str, member: &str) -> bool {
        let mut map = self.entries.lock().await;
        match Self::live(&mut map, key) {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => set.insert(member.to_string()),
            Some(_) => false,
            None => {
                let mut set = HashSet::new();
                set.insert(member.to_string());
                map.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Set(set),
                        expires_at: None,
                    },
                );
                true
            }
        }
    }

    async fn smembers(&self, key: &str) -> Vec<String> {
        let mut map = self.entries.lock().await;
        match Self::live(&mut map, key) {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => set.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    async fn srem(&self, key: &str, member: &str) -> bool {
        let mut map = self.entries.lock().await;
        match Self::live(&mut map, key) {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => set.remove(member),
            _ => false,
        }
    }

    async fn lpush_front(&self, key: &str, value: &str) -> bool {
        let mut map = self.entries.lock().await;
        match Self::live(&mut map, key) {
            Some(Entry {
                value: Value::List(list),
                ..
            }) => {
                list.push_front(value.to_string());
                true
            }
            Some(_) => false,
            None => {
                let mut list = VecDeque::new();
                list.push_front(value.to_string());
                map.insert(
                    key.to_string(),
                    Entry {
                        value: Value::List(list),
                        expires_at: None,
                    },
                );
                true
            }
        }
    }

    async fn ltrim(&self, key: &str, max_len: usize) -> bool {
        let mut map = self.entries.lock().await;
        match Self::live(&mut map, key) {
            Some(Entry {
                value: Value::List(list),
                ..
            }) => {
                list.truncate(max_len);
                true
            }
            _ => false,
        }
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Vec<String> {
        let mut map = self.entries.lock().await;
        let list = match Self::live(&mut map, key) {
            Some(Entry {
                value: Value::List(list),
                ..
            }) => list,
            _ => return Vec::new(),
        };

        // Redis index semantics: negative indices count from the tail,
        // out-of-range bounds are clamped, inverted ranges are empty.
        let len = list.len() as i64;
        let s = if start < 0 { (len + start).max(0) } else { start };
        let e = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if s > e || s >= len {
            return Vec::new();
        }
        list.iter()
            .skip(s as usize)
            .take((e - s + 1) as usize)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_del() {
        let store = MemoryStore::new();
        assert!(store.set("k", "v", None).await);
        assert_eq!(store.get("k").await.as_deref(), Some("v"));
        assert!(store.exists("k").await);
        assert!(store.del("k").await);
        assert!(!store.del("k").await);
        assert_eq!(store.get("k").await, None);
    }

    #[tokio::test]
    async fn test_ttl_expiry_is_silent() {
        let store = MemoryStore::new();
        store
            .set("short", "v", Some(Duration::from_millis(30)))
            .await;
        assert!(store.exists("short").await);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!store.exists("short").await);
        assert_eq!(store.get("short").await, None);
    }

    #[tokio::test]
    async fn test_incr_creates_at_one() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("counter").await, Some(1));
        assert_eq!(store.incr("counter").await, Some(2));
        assert_eq!(store.incr("counter").await, Some(3));
    }

    #[tokio::test]
    async fn test_incr_non_integer_fails_soft() {
        let store = MemoryStore::new();
        store.set("k", "not a number", None).await;
        assert_eq!(store.incr("k").await, None);
    }

    #[tokio::test]
    async fn test_expire_refreshes_ttl() {
        let store = MemoryStore::new();
        store.set("k", "v", Some(Duration::from_millis(30))).await;
        assert!(store.expire("k", Duration::from_millis(200)).await);

        tokio::time::sleep(Duration::from_millis(60)).await;
        // Still alive thanks to the refreshed TTL
        assert!(store.exists("k").await);
        // expire on an absent key is false
        assert!(!store.expire("missing", Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_set_operations() {
        let store = MemoryStore::new();
        assert!(store.sadd("s", "a").await);
        assert!(store.sadd("s", "b").await);
        assert!(!store.sadd("s", "a").await); // duplicate

        let mut members = store.smembers("s").await;
        members.sort();
        assert_eq!(members, vec!["a", "b"]);

        assert!(store.srem("s", "a").await);
        assert!(!store.srem("s", "a").await);
        assert_eq!(store.smembers("s").await, vec!["b"]);
    }

    #[tokio::test]
    async fn test_list_push_and_trim() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.lpush_front("l", &i.to_string()).await;
        }
        // Head is the most recent push
        assert_eq!(store.lrange("l", 0, 0).await, vec!["4"]);
        assert_eq!(store.lrange("l", 0, -1).await.len(), 5);

        store.ltrim("l", 3).await;
        assert_eq!(store.lrange("l", 0, -1).await, vec!["4", "3", "2"]);
    }

    #[tokio::test]
    async fn test_lrange_bounds() {
        let store = MemoryStore::new();
        for v in ["c", "b", "a"] {
            store.lpush_front("l", v).await;
        }
        // list is a, b, c
        assert_eq!(store.lrange("l", 1, 1).await, vec!["b"]);
        assert_eq!(store.lrange("l", -2, -1).await, vec!["b", "c"]);
        assert_eq!(store.lrange("l", 5, 9).await, Vec::<String>::new());
        assert_eq!(store.lrange("l", 2, 1).await, Vec::<String>::new());
        assert_eq!(store.lrange("missing", 0, -1).await, Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_type_mismatch_degrades() {
        let store = MemoryStore::new();
        store.set("k", "v", None).await;
        // Set/list ops against a string key degrade to no-ops
        assert!(!store.sadd("k", "m").await);
        assert!(store.smembers("k").await.is_empty());
        assert!(!store.lpush_front("k", "x").await);
    }
}
