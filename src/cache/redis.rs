use super::ResultCache;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::{debug, info, warn};

/// Redis-backed result cache.
///
/// The connection manager reconnects on its own; while the store is
/// unreachable every operation degrades to a miss or no-op so the fetch path
/// keeps working without it.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis and verify the connection with a ping.
    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let mut connection = ConnectionManager::new(client).await?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut connection)
            .await?;
        info!(url = redis_url, "Connected to redis result cache");

        Ok(Self { connection })
    }
}

#[async_trait]
impl ResultCache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut connection = self.connection.clone();
        match connection.get::<_, Option<String>>(key).await {
            Ok(Some(value)) => {
                debug!(key, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                debug!(key, "Cache miss");
                None
            }
            Err(e) => {
                warn!(key, error = %e, "Cache get failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let mut connection = self.connection.clone();
        match connection.set_ex::<_, _, ()>(key, value, ttl_secs).await {
            Ok(()) => {
                debug!(key, ttl_secs, "Cache set");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "Cache set failed, skipping");
                false
            }
        }
    }

    async fn delete_matching(&self, pattern: &str) -> u64 {
        let mut connection = self.connection.clone();

        let keys: Vec<String> = match connection.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(pattern, error = %e, "Cache key scan failed, skipping delete");
                return 0;
            }
        };
        if keys.is_empty() {
            debug!(pattern, "No keys matched pattern");
            return 0;
        }

        match connection.del::<_, u64>(keys).await {
            Ok(deleted) => {
                debug!(pattern, deleted, "Cache pattern delete");
                deleted
            }
            Err(e) => {
                warn!(pattern, error = %e, "Cache pattern delete failed");
                0
            }
        }
    }

    async fn delete(&self, key: &str) -> bool {
        let mut connection = self.connection.clone();
        match connection.del::<_, u64>(key).await {
            Ok(deleted) => {
                debug!(key, "Cache delete");
                deleted > 0
            }
            Err(e) => {
                warn!(key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    async fn flush_all(&self) -> bool {
        let mut connection = self.connection.clone();
        match redis::cmd("FLUSHALL")
            .query_async::<_, ()>(&mut connection)
            .await
        {
            Ok(()) => {
                info!("Cache cleared: all keys deleted");
                true
            }
            Err(e) => {
                warn!(error = %e, "Cache flush failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_redis_roundtrip() {
        let cache = RedisCache::connect("redis://127.0.0.1:6379")
            .await
            .expect("Failed to connect to Redis");

        let key = "catalog-relay:test:roundtrip";
        assert!(cache.set(key, r#"{"ok":true}"#, 60).await);
        assert_eq!(cache.get(key).await.as_deref(), Some(r#"{"ok":true}"#));
        assert!(cache.delete(key).await);
        assert!(cache.get(key).await.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_redis_pattern_delete() {
        let cache = RedisCache::connect("redis://127.0.0.1:6379")
            .await
            .expect("Failed to connect to Redis");

        cache.set("catalog-relay:test:a", "1", 60).await;
        cache.set("catalog-relay:test:b", "2", 60).await;

        let deleted = cache.delete_matching("catalog-relay:test:*").await;
        assert!(deleted >= 2);
        assert!(cache.get("catalog-relay:test:a").await.is_none());
    }
}
