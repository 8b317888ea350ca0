//! Namespaced cache keys

use std::fmt;

/// Prefix shared by every cache key so cached replies never collide with
/// configuration keys kept in the same backing store
pub const CACHE_KEY_PREFIX: &str = "cache_";

/// Identifies a cached reply by the conversation it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    channel: String,
    thread_id: String,
}

impl CacheKey {
    pub fn new(channel: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            thread_id: thread_id.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Key under which the entry is persisted: `cache_{channel}_{threadId}`
    pub fn storage_key(&self) -> String {
        format!("{}{}_{}", CACHE_KEY_PREFIX, self.channel, self.thread_id)
    }

    /// Whether a raw backing-store key belongs to the cache namespace
    pub fn is_namespaced(raw: &str) -> bool {
        raw.starts_with(CACHE_KEY_PREFIX)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}
