pub mod memory;
pub mod redis;

pub use memory::MemoryCache;
pub use redis::RedisCache;

use async_trait::async_trait;

/// Time-to-live assignments per logical resource, in seconds.
///
/// The fetch path only uses `EXTERNAL_API`; the rest are the invalidation
/// surface for the CRUD layer that sits around the relay.
pub mod ttl {
    pub const PRODUCT_LIST: u64 = 300;
    pub const PRODUCT_SINGLE: u64 = 3600;
    pub const USER_DATA: u64 = 1800;
    pub const EXTERNAL_API: u64 = 600;
    pub const CATEGORY_LIST: u64 = 1800;
}

/// Best-effort result cache.
///
/// Every operation returns a neutral value (miss, zero, false) instead of an
/// error when the underlying store is unavailable; callers never see store
/// failures. TTLs are mandatory on every write.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Fetch the serialized value for a key, if present and unexpired.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a serialized value under a key with the given TTL.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> bool;

    /// Delete every key matching a glob pattern; returns how many were removed.
    async fn delete_matching(&self, pattern: &str) -> u64;

    /// Delete a single key; true if it existed.
    async fn delete(&self, key: &str) -> bool;

    /// Drop every entry in the store.
    async fn flush_all(&self) -> bool;
}

/// Translate a redis-style glob pattern (`products:*`) into an anchored regex.
pub(crate) fn pattern_to_regex(pattern: &str) -> Option<regex::Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for (i, literal) in pattern.split('*').enumerate() {
        if i > 0 {
            expr.push_str(".*");
        }
        expr.push_str(&regex::escape(literal));
    }
    expr.push('$');
    regex::Regex::new(&expr).ok()
}
