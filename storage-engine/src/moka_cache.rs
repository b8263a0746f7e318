use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache;
use shared::Result;
use std::fmt::Debug;
use vakit::CacheKey;
use vakit::ports::CacheBackend;

/// In-process cache backend on top of Moka.
/// Entries carry no expiry; a capacity bound lets Moka evict on its own.
#[derive(Clone)]
pub struct MokaCache {
    cache: Cache<String, Bytes>,
}

impl MokaCache {
    /// Create a new unbounded Moka cache
    pub fn new_unbounded(name: &str) -> Self {
        Self::new(name, None)
    }

    /// Create a new bounded Moka cache holding at most `max_entries` entries
    pub fn new_bounded(name: &str, max_entries: u64) -> Self {
        Self::new(name, Some(max_entries))
    }

    pub fn new(name: &str, max_entries: Option<u64>) -> Self {
        let mut builder = Cache::builder().name(name);

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        Self {
            cache: builder.build(),
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl CacheBackend for MokaCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>> {
        Ok(self.cache.get(key.as_str()).await)
    }

    async fn put(&self, key: &CacheKey, value: Bytes) -> Result<()> {
        self.cache.insert(key.as_str().to_string(), value).await;
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.cache.remove(key.as_str()).await.is_some())
    }
}

impl Debug for MokaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCache")
            .field("name", &self.cache.name())
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, sleep};

    fn key(city: &str) -> CacheKey {
        CacheKey::derive("/vakitler", [("sehir", city), ("saat", "0")])
    }

    #[tokio::test]
    async fn test_moka_cache_put_and_get() {
        let cache = MokaCache::new_unbounded("test");

        cache
            .put(&key("9541"), Bytes::from_static(b"[]"))
            .await
            .unwrap();

        let value = cache.get(&key("9541")).await.unwrap();
        assert_eq!(value, Some(Bytes::from_static(b"[]")));
    }

    #[tokio::test]
    async fn test_moka_cache_get_nonexistent_is_none() {
        let cache = MokaCache::new_unbounded("test");

        // a miss is a normal result, not an error
        let value = cache.get(&key("nonexistent")).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_moka_cache_delete() {
        let cache = MokaCache::new_unbounded("test");
        cache
            .put(&key("9541"), Bytes::from_static(b"[]"))
            .await
            .unwrap();

        assert!(cache.delete(&key("9541")).await.unwrap());
        assert!(!cache.delete(&key("9541")).await.unwrap());
        assert!(cache.get(&key("9541")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_moka_cache_overwrite() {
        let cache = MokaCache::new_unbounded("test");

        cache
            .put(&key("9541"), Bytes::from_static(b"[1]"))
            .await
            .unwrap();
        cache
            .put(&key("9541"), Bytes::from_static(b"[2]"))
            .await
            .unwrap();

        let value = cache.get(&key("9541")).await.unwrap();
        assert_eq!(value, Some(Bytes::from_static(b"[2]")));
    }

    #[tokio::test]
    async fn test_moka_cache_bounded() {
        let cache = MokaCache::new_bounded("test", 2);

        for city in ["1", "2", "3", "4"] {
            cache.put(&key(city), Bytes::from_static(b"[]")).await.unwrap();
        }

        // Wait for eviction to take effect
        cache.cache.run_pending_tasks().await;
        sleep(Duration::from_millis(50)).await;

        assert!(cache.entry_count() <= 2, "Cache should have at most 2 entries");
    }
}
