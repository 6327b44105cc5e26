//! In-memory cache and counters, used when Redis is not configured or unreachable.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use geofeed_core::ports::{Cache, CacheError, CounterCache};

struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

/// Process-local key/value cache plus atomic counters.
///
/// Counter updates take the write lock for the whole read-modify-write, so
/// concurrent increments and decrements never lose updates.
/// Data is lost on restart.
#[derive(Default)]
pub struct InMemoryCache {
    store: RwLock<HashMap<String, CacheEntry>>,
    counters: RwLock<HashMap<String, i64>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let store = self.store.read().await;
        let entry = store.get(key)?;

        if entry.is_expired() {
            drop(store);
            self.store.write().await.remove(key);
            return None;
        }

        Some(entry.value.clone())
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.store.write().await.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.write().await.remove(key);
        Ok(())
    }
}

#[async_trait]
impl CounterCache for InMemoryCache {
    async fn increment(&self, key: &str) -> Result<i64, CacheError> {
        let mut counters = self.counters.write().await;
        let value = counters.entry(key.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn decrement_floor(&self, key: &str) -> Result<i64, CacheError> {
        let mut counters = self.counters.write().await;
        let value = counters.entry(key.to_string()).or_insert(0);
        if *value > 0 {
            *value -= 1;
        } else {
            *value = 0;
        }
        Ok(*value)
    }

    async fn get(&self, key: &str) -> Result<i64, CacheError> {
        Ok(self.counters.read().await.get(key).copied().unwrap_or(0))
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<i64>, CacheError> {
        let counters = self.counters.read().await;
        Ok(keys
            .iter()
            .map(|k| counters.get(k).copied().unwrap_or(0))
            .collect())
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), CacheError> {
        self.counters.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryCache::new();
        Cache::set(&cache, "key1", "value1", None).await.unwrap();
        assert_eq!(Cache::get(&cache, "key1").await, Some("value1".to_string()));

        cache.delete("key1").await.unwrap();
        assert_eq!(Cache::get(&cache, "key1").await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_miss() {
        let cache = InMemoryCache::new();
        Cache::set(&cache, "short", "v", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(Cache::get(&cache, "short").await, None);
    }

    #[tokio::test]
    async fn test_decrement_never_goes_negative() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.decrement_floor("unseen").await.unwrap(), 0);

        CounterCache::set(&cache, "neg", -3).await.unwrap();
        assert_eq!(cache.decrement_floor("neg").await.unwrap(), 0);

        cache.increment("c").await.unwrap();
        assert_eq!(cache.decrement_floor("c").await.unwrap(), 0);
        assert_eq!(cache.decrement_floor("c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_increments() {
        let cache = Arc::new(InMemoryCache::new());
        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.increment("hot").await.unwrap() })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(CounterCache::get(cache.as_ref(), "hot").await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_get_many_preserves_order() {
        let cache = InMemoryCache::new();
        CounterCache::set(&cache, "a", 3).await.unwrap();
        CounterCache::set(&cache, "c", 7).await.unwrap();

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(cache.get_many(&keys).await.unwrap(), vec![3, 0, 7]);
    }
}
