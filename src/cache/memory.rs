use super::{pattern_to_regex, ResultCache};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// In-process result cache used when no Redis URL is configured, and in tests.
///
/// Entries carry their own TTL, mirroring the per-key expiries the Redis
/// adapter gets from `SETEX`.
pub struct MemoryCache {
    cache: Cache<String, Entry>,
}

#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

impl MemoryCache {
    /// Create a new in-memory result cache
    pub fn new(max_capacity: u64) -> Self {
        info!(max_capacity, "Initialized in-memory result cache");
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(EntryExpiry)
                .build(),
        }
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        match self.cache.get(key).await {
            Some(entry) => {
                debug!(key, "Cache hit");
                Some(entry.value)
            }
            None => {
                debug!(key, "Cache miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        self.cache
            .insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    ttl: Duration::from_secs(ttl_secs),
                },
            )
            .await;
        debug!(key, ttl_secs, "Cache set");
        true
    }

    async fn delete_matching(&self, pattern: &str) -> u64 {
        let Some(re) = pattern_to_regex(pattern) else {
            warn!(pattern, "Invalid cache key pattern, skipping delete");
            return 0;
        };

        // Recent writes are not visible to iter() until pending tasks run.
        self.cache.run_pending_tasks().await;

        let matched: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| re.is_match(key))
            .map(|(key, _)| (*key).clone())
            .collect();

        for key in &matched {
            self.cache.invalidate(key.as_str()).await;
        }
        debug!(pattern, deleted = matched.len(), "Cache pattern delete");
        matched.len() as u64
    }

    async fn delete(&self, key: &str) -> bool {
        let existed = self.cache.get(key).await.is_some();
        self.cache.invalidate(key).await;
        debug!(key, "Cache delete");
        existed
    }

    async fn flush_all(&self) -> bool {
        self.cache.invalidate_all();
        info!("Cache cleared: all keys deleted");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ttl;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new(100);

        assert!(cache.get("missing").await.is_none());
        assert!(cache.set("products:list", "[1,2,3]", ttl::PRODUCT_LIST).await);
        assert_eq!(cache.get("products:list").await.as_deref(), Some("[1,2,3]"));
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MemoryCache::new(100);

        cache.set("products:1", "{}", ttl::PRODUCT_SINGLE).await;
        assert!(cache.delete("products:1").await);
        assert!(!cache.delete("products:1").await);
        assert!(cache.get("products:1").await.is_none());
    }

    #[tokio::test]
    async fn test_delete_matching() {
        let cache = MemoryCache::new(100);

        cache.set("products:list:page1", "[]", ttl::PRODUCT_LIST).await;
        cache.set("products:list:page2", "[]", ttl::PRODUCT_LIST).await;
        cache.set("products:42", "{}", ttl::PRODUCT_SINGLE).await;
        cache.set("users:42", "{}", ttl::USER_DATA).await;

        let deleted = cache.delete_matching("products:*").await;
        assert_eq!(deleted, 3);
        assert!(cache.get("products:42").await.is_none());
        assert_eq!(cache.get("users:42").await.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_flush_all() {
        let cache = MemoryCache::new(100);

        cache.set("categories:list", "[]", ttl::CATEGORY_LIST).await;
        cache.set("products:list", "[]", ttl::PRODUCT_LIST).await;
        assert!(cache.flush_all().await);
        assert!(cache.get("categories:list").await.is_none());
        assert!(cache.get("products:list").await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_by_ttl() {
        let cache = MemoryCache::new(100);

        cache.set("short-lived", "soon gone", 1).await;
        assert!(cache.get("short-lived").await.is_some());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(cache.get("short-lived").await.is_none());
    }
}
