//! Redis key-value store

use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};

use crate::domain::cache::KeyValueStore;
use crate::domain::DomainError;

/// Keys fetched per SCAN round trip
const SCAN_BATCH: usize = 100;

/// Configuration for Redis store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing inside a shared database
    pub key_prefix: Option<String>,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
        }
    }
}

impl RedisStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// Redis-backed store. Connection pooling via ConnectionManager.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    pub async fn new(config: RedisStoreConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::storage(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    fn strip_prefix(&self, key: String) -> String {
        match &self.config.key_prefix {
            Some(prefix) => key
                .strip_prefix(prefix.as_str())
                .and_then(|k| k.strip_prefix(':'))
                .map(str::to_string)
                .unwrap_or(key),
            None => key,
        }
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<String>, DomainError> {
        let pattern = format!("{}*", self.prefix_key(prefix));
        let mut conn = self.connection.clone();
        let mut cursor = 0u64;
        let mut found = Vec::new();

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| map_redis_error("scan keys", e))?;

            found.extend(keys);
            cursor = next_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }
}

/// OOM replies mean `maxmemory` was hit, which is the store's quota
fn map_redis_error(operation: &str, error: RedisError) -> DomainError {
    if error.code() == Some("OOM") {
        DomainError::quota_exceeded(format!("Redis out of memory during {}", operation))
    } else {
        DomainError::storage(format!("Failed to {}: {}", operation, error))
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.get(self.prefix_key(key))
            .await
            .map_err(|e| map_redis_error("get key", e))
    }

    async fn set_raw(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        conn.set(self.prefix_key(key), value)
            .await
            .map_err(|e| map_redis_error("set key", e))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let deleted: i32 = conn
            .del(self.prefix_key(key))
            .await
            .map_err(|e| map_redis_error("delete key", e))?;

        Ok(deleted > 0)
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, DomainError> {
        Ok(self
            .scan(prefix)
            .await?
            .into_iter()
            .map(|k| self.strip_prefix(k))
            .collect())
    }

    async fn usage_bytes(&self, prefix: &str) -> Result<u64, DomainError> {
        let mut conn = self.connection.clone();
        let mut total = 0u64;

        for key in self.scan(prefix).await? {
            let len: u64 = conn
                .strlen(&key)
                .await
                .map_err(|e| map_redis_error("measure key", e))?;
            total += len + key.len() as u64;
        }

        Ok(total)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
