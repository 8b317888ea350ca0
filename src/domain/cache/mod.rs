//! Cache domain - namespaced TTL cache over a pluggable key-value store

mod entry;
mod key;
mod repository;
mod store;

pub use entry::{current_time_millis, CacheEntry};
pub use key::{CacheKey, CACHE_KEY_PREFIX};
pub use repository::KeyValueStore;
pub use store::{CacheStats, CacheStore, DEFAULT_TTL};

#[cfg(test)]
pub use repository::mock::MockKeyValueStore;
