use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;

/// Key-value store backing the content cache and retry ledger.
///
/// Both consumers need only per-key expiry and an atomic increment; the
/// production implementation is Redis, while [`MemoryKv`] serves tests and
/// embedded use without a running server.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Store `value` under `key`, expiring after `ttl`. Last write wins.
    async fn put_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError>;

    /// Atomically increment the counter at `key`, arming `ttl` when the key
    /// is created, and return the new count. Concurrent callers never lose
    /// increments.
    async fn incr_ex(&self, key: &str, ttl: Duration) -> Result<u64, KvError>;
}

/// Redis-backed store. Cloning shares the underlying client.
#[derive(Clone)]
pub struct RedisKv {
    client: redis::Client,
}

// INCR the key and arm its expiry only on creation, in one round trip, so
// redelivered copies of the same failing job racing across workers cannot
// lose counts or refresh the window indefinitely.
const INCR_EX_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

impl RedisKv {
    pub fn new(redis_url: &str) -> Result<Self, KvError> {
        let client = redis::Client::open(redis_url).map_err(KvError::Redis)?;
        Ok(Self { client })
    }

    /// Check Redis connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), KvError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(KvError::Redis)?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(KvError::Redis)?;
        Ok(())
    }
}

#[async_trait]
impl KvBackend for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(KvError::Redis)?;
        let value: Option<String> = conn.get(key).await.map_err(KvError::Redis)?;
        Ok(value)
    }

    async fn put_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(KvError::Redis)?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs())
            .await
            .map_err(KvError::Redis)?;
        Ok(())
    }

    async fn incr_ex(&self, key: &str, ttl: Duration) -> Result<u64, KvError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(KvError::Redis)?;
        let count: u64 = redis::Script::new(INCR_EX_SCRIPT)
            .key(key)
            .arg(ttl.as_secs())
            .invoke_async(&mut conn)
            .await
            .map_err(KvError::Redis)?;
        Ok(count)
    }
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// In-memory store with the same expiry semantics as the Redis backend.
#[derive(Clone, Default)]
pub struct MemoryKv {
    entries: Arc<Mutex<HashMap<String, MemoryEntry>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn incr_ex(&self, key: &str, ttl: Duration) -> Result<u64, KvError> {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        match entries.get_mut(key) {
            Some(entry) if entry.expires_at > now => {
                let count: u64 =
                    entry
                        .value
                        .parse()
                        .map_err(|_| KvError::NonNumericCounter {
                            key: key.to_string(),
                        })?;
                entry.value = (count + 1).to_string();
                Ok(count + 1)
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    MemoryEntry {
                        value: "1".to_string(),
                        expires_at: now + ttl,
                    },
                );
                Ok(1)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Non-numeric counter value at key {key}")]
    NonNumericCounter { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_none_for_missing_key() {
        let kv = MemoryKv::new();
        assert!(kv.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let kv = MemoryKv::new();
        kv.put_ex("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn entries_expire() {
        let kv = MemoryKv::new();
        kv.put_ex("k", "v", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(kv.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_overwrites_existing_value() {
        let kv = MemoryKv::new();
        kv.put_ex("k", "first", Duration::from_secs(60))
            .await
            .unwrap();
        kv.put_ex("k", "second", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn incr_starts_at_one_and_counts_up() {
        let kv = MemoryKv::new();
        assert_eq!(kv.incr_ex("n", Duration::from_secs(60)).await.unwrap(), 1);
        assert_eq!(kv.incr_ex("n", Duration::from_secs(60)).await.unwrap(), 2);
        assert_eq!(kv.incr_ex("n", Duration::from_secs(60)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn incr_resets_after_expiry() {
        let kv = MemoryKv::new();
        assert_eq!(kv.incr_ex("n", Duration::from_millis(10)).await.unwrap(), 1);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(kv.incr_ex("n", Duration::from_secs(60)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn incr_rejects_non_numeric_value() {
        let kv = MemoryKv::new();
        kv.put_ex("n", "not-a-number", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(matches!(
            kv.incr_ex("n", Duration::from_secs(60)).await,
            Err(KvError::NonNumericCounter { .. })
        ));
    }
}
