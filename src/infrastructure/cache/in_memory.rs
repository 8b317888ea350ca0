//! In-memory key-value store using moka

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use tokio::sync::Mutex;

use crate::domain::cache::KeyValueStore;
use crate::domain::DomainError;

/// Configuration for in-memory store
#[derive(Debug, Clone)]
pub struct InMemoryStoreConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
    /// Byte budget for keys plus values; writes past it fail with a quota fault
    pub quota_bytes: Option<u64>,
}

impl Default for InMemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            quota_bytes: None,
        }
    }
}

impl InMemoryStoreConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_quota_bytes(mut self, bytes: u64) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }
}

/// Thread-safe in-memory store. Expiry is owned by the cache layer above,
/// so entries here live until removed or evicted for capacity.
///
/// With a quota, writes are serialized so the usage check and the insert
/// see the same contents.
#[derive(Debug)]
pub struct InMemoryStore {
    cache: MokaCache<String, String>,
    config: InMemoryStoreConfig,
    write_lock: Mutex<()>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_config(InMemoryStoreConfig::default())
    }

    pub fn with_config(config: InMemoryStoreConfig) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .build();

        Self {
            cache,
            config,
            write_lock: Mutex::new(()),
        }
    }

    fn weight(key: &str, value: &str) -> u64 {
        (key.len() + value.len()) as u64
    }

    async fn used_bytes(&self, prefix: &str) -> u64 {
        self.cache.run_pending_tasks().await;

        self.cache
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| Self::weight(&k, &v))
            .sum()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.cache.get(key).await)
    }

    async fn set_raw(&self, key: &str, value: &str) -> Result<(), DomainError> {
        if let Some(quota) = self.config.quota_bytes {
            let _guard = self.write_lock.lock().await;

            let existing = self
                .cache
                .get(key)
                .await
                .map(|v| Self::weight(key, &v))
                .unwrap_or(0);
            let projected = self.used_bytes("").await.saturating_sub(existing)
                + Self::weight(key, value);

            if projected > quota {
                return Err(DomainError::quota_exceeded(format!(
                    "Storage quota of {} bytes exceeded ({} bytes needed)",
                    quota, projected
                )));
            }

            self.cache.insert(key.to_string(), value.to_string()).await;
            return Ok(());
        }

        self.cache.insert(key.to_string(), value.to_string()).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, DomainError> {
        self.cache.run_pending_tasks().await;

        Ok(self
            .cache
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.to_string())
            .collect())
    }

    async fn usage_bytes(&self, prefix: &str) -> Result<u64, DomainError> {
        Ok(self.used_bytes(prefix).await)
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::domain::cache::{CacheKey, CacheStore};

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = InMemoryStore::new();

        store.set_raw("k1", "v1").await.unwrap();
        assert_eq!(store.get_raw("k1").await.unwrap(), Some("v1".to_string()));

        assert!(store.delete("k1").await.unwrap());
        assert!(!store.delete("k1").await.unwrap());
        assert_eq!(store.get_raw("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_by_prefix() {
        let store = InMemoryStore::new();
        store.set_raw("cache_a_1", "x").await.unwrap();
        store.set_raw("cache_a_2", "y").await.unwrap();
        store.set_raw("settings", "z").await.unwrap();

        let mut keys = store.keys("cache_").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["cache_a_1".to_string(), "cache_a_2".to_string()]);
        assert_eq!(store.usage_bytes("cache_").await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_quota_exceeded() {
        let store = InMemoryStore::with_config(InMemoryStoreConfig::default().with_quota_bytes(20));

        store.set_raw("k1", "0123456789").await.unwrap();
        let err = store.set_raw("k2", "0123456789").await.unwrap_err();
        assert!(err.is_quota_exceeded());

        // overwriting in place only counts the difference
        store.set_raw("k1", "9876543210").await.unwrap();
    }

    #[tokio::test]
    async fn test_cache_store_over_moka_expires_entries() {
        let cache = CacheStore::new(Arc::new(InMemoryStore::new()));
        let key = CacheKey::new("c1", "t1");

        cache
            .set(&key, "X", Some(Duration::from_millis(1000)))
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("X"));

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.get(&key).await.unwrap(), None);
        assert!(cache.backend().get_raw("cache_c1_t1").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_writers_stay_within_quota() {
        let store = Arc::new(InMemoryStore::with_config(
            InMemoryStoreConfig::default().with_quota_bytes(100),
        ));
        let value = "x".repeat(19);

        for _ in 0..50 {
            let writers: Vec<_> = (0..32)
                .map(|n| {
                    let store = store.clone();
                    let value = value.clone();
                    tokio::spawn(async move {
                        let _ = store.set_raw(&format!("cache_c_{:02}", n), &value).await;
                    })
                })
                .collect();
            for writer in writers {
                writer.await.unwrap();
            }

            let used = store.usage_bytes("").await.unwrap();
            assert!(used <= 100, "usage {} exceeds quota", used);

            for n in 0..32 {
                store.delete(&format!("cache_c_{:02}", n)).await.unwrap();
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_set_and_get_on_one_key() {
        let cache = CacheStore::new(Arc::new(InMemoryStore::new()));
        let key = CacheKey::new("support", "t-1");
        let written: Vec<String> = (0..16).map(|n| format!("reply number {}", n)).collect();

        let tasks: Vec<_> = written
            .iter()
            .cloned()
            .map(|value| {
                let cache = cache.clone();
                let key = key.clone();
                tokio::spawn(async move {
                    cache.set(&key, &value, None).await.unwrap();
                    cache.get(&key).await.unwrap()
                })
            })
            .collect();

        for task in tasks {
            let seen = task.await.unwrap();
            assert!(seen.is_some_and(|v| written.contains(&v)));
        }

        let last = cache.get(&key).await.unwrap().unwrap();
        assert!(written.contains(&last));
        assert_eq!(cache.backend().keys("cache_").await.unwrap().len(), 1);
    }
}
