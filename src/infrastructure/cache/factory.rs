//! Backing store factory for runtime selection

use std::sync::Arc;

use crate::domain::cache::KeyValueStore;
use crate::domain::DomainError;

use super::in_memory::{InMemoryStore, InMemoryStoreConfig};
use super::redis::{RedisStore, RedisStoreConfig};

/// Supported backing store types
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StoreType {
    /// In-memory store using moka
    #[default]
    InMemory,
    /// Redis store
    Redis,
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreType::InMemory => write!(f, "in_memory"),
            StoreType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for StoreType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(StoreType::InMemory),
            "redis" => Ok(StoreType::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown cache backend: {}. Valid backends: in_memory, redis",
                s
            ))),
        }
    }
}

/// Configuration for store factory
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub store_type: StoreType,
    /// Redis URL (required for Redis type)
    pub redis_url: Option<String>,
    /// Redis key prefix
    pub key_prefix: Option<String>,
    /// Maximum entry count (in-memory only)
    pub max_capacity: Option<u64>,
    /// Byte quota (in-memory only; Redis relies on `maxmemory`)
    pub quota_bytes: Option<u64>,
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            store_type: StoreType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    pub fn with_quota_bytes(mut self, bytes: u64) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// Factory for creating backing stores
#[derive(Debug, Default)]
pub struct StoreFactory;

impl StoreFactory {
    pub fn new() -> Self {
        Self
    }

    pub async fn create(&self, config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>, DomainError> {
        match config.store_type {
            StoreType::InMemory => {
                let mut in_memory_config = InMemoryStoreConfig::default();

                if let Some(capacity) = config.max_capacity {
                    in_memory_config = in_memory_config.with_max_capacity(capacity);
                }

                if let Some(quota) = config.quota_bytes {
                    in_memory_config = in_memory_config.with_quota_bytes(quota);
                }

                Ok(Arc::new(InMemoryStore::with_config(in_memory_config)))
            }
            StoreType::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for the redis cache backend")
                })?;

                let mut redis_config = RedisStoreConfig::new(url);

                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix.clone());
                }

                Ok(Arc::new(RedisStore::new(redis_config).await?))
            }
        }
    }
}
