//! Namespaced TTL cache for generated replies

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::entry::current_time_millis;
use super::{CacheEntry, CacheKey, KeyValueStore, CACHE_KEY_PREFIX};
use crate::domain::DomainError;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub usage_bytes: u64,
}

/// TTL cache over a shared [`KeyValueStore`].
///
/// Entries carry their own `expiresAt`; expired entries are evicted lazily
/// on `get` and in bulk by `sweep`. Only keys under [`CACHE_KEY_PREFIX`] are
/// ever read, removed or counted.
#[derive(Debug, Clone)]
pub struct CacheStore {
    backend: Arc<dyn KeyValueStore>,
    default_ttl: Duration,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            default_ttl: DEFAULT_TTL,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Returns the cached value, evicting it first if it has expired
    pub async fn get(&self, key: &CacheKey) -> Result<Option<String>, DomainError> {
        let storage_key = key.storage_key();

        let Some(raw) = self.backend.get_raw(&storage_key).await? else {
            debug!(key = %storage_key, "Cache miss");
            return Ok(None);
        };

        let entry = match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %storage_key, error = %e, "Discarding unreadable cache entry");
                self.backend.delete(&storage_key).await?;
                return Ok(None);
            }
        };

        if entry.is_expired(current_time_millis()) {
            debug!(key = %storage_key, expires_at = entry.expires_at, "Evicting expired cache entry");
            self.backend.delete(&storage_key).await?;
            return Ok(None);
        }

        debug!(key = %storage_key, "Cache hit");
        Ok(Some(entry.value))
    }

    /// Stores `value` for `ttl`, or the default TTL (one hour) when `None`
    pub async fn set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), DomainError> {
        let storage_key = key.storage_key();
        let entry = CacheEntry::new(value, ttl.unwrap_or(self.default_ttl), current_time_millis());
        let data = serde_json::to_string(&entry)
            .map_err(|e| DomainError::storage(format!("Failed to serialize cache entry: {}", e)))?;

        self.backend.set_raw(&storage_key, &data).await?;
        debug!(key = %storage_key, expires_at = entry.expires_at, "Cached reply");
        Ok(())
    }

    pub async fn remove(&self, key: &CacheKey) -> Result<bool, DomainError> {
        self.backend.delete(&key.storage_key()).await
    }

    /// Removes every expired or unreadable namespaced entry. A backing store
    /// that is unavailable yields 0 rather than an error.
    pub async fn sweep(&self) -> usize {
        let keys = match self.backend.keys(CACHE_KEY_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Cache sweep skipped, store unavailable");
                return 0;
            }
        };

        let now = current_time_millis();
        let mut removed = 0;

        for key in keys.iter().filter(|k| CacheKey::is_namespaced(k)) {
            let stale = match self.backend.get_raw(key).await {
                Ok(Some(raw)) => serde_json::from_str::<CacheEntry>(&raw)
                    .map(|entry| entry.is_expired(now))
                    .unwrap_or(true),
                Ok(None) => false,
                Err(e) => {
                    warn!(key = %key, error = %e, "Cache sweep interrupted");
                    break;
                }
            };

            if stale {
                match self.backend.delete(key).await {
                    Ok(true) => removed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(key = %key, error = %e, "Cache sweep interrupted");
                        break;
                    }
                }
            }
        }

        info!(removed, scanned = keys.len(), "Cache sweep finished");
        removed
    }

    pub async fn usage_bytes(&self) -> Result<u64, DomainError> {
        self.backend.usage_bytes(CACHE_KEY_PREFIX).await
    }

    /// Removes every namespaced entry, leaving foreign keys untouched
    pub async fn clear(&self) -> Result<usize, DomainError> {
        let keys = self.backend.keys(CACHE_KEY_PREFIX).await?;
        let mut removed = 0;

        for key in keys.iter().filter(|k| CacheKey::is_namespaced(k)) {
            if self.backend.delete(key).await? {
                removed += 1;
            }
        }

        info!(removed, "Cache cleared");
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<CacheStats, DomainError> {
        let entries = self.backend.keys(CACHE_KEY_PREFIX).await?.len();
        let usage_bytes = self.usage_bytes().await?;

        Ok(CacheStats {
            entries,
            usage_bytes,
        })
    }
}
