use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Persisted form of a cached reply: `{value, expiresAt}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub value: String,
    /// Epoch milliseconds
    pub expires_at: u64,
}

impl CacheEntry {
    pub fn new(value: impl Into<String>, ttl: Duration, now_millis: u64) -> Self {
        Self {
            value: value.into(),
            expires_at: now_millis.saturating_add(ttl.as_millis() as u64),
        }
    }

    pub fn is_expired(&self, now_millis: u64) -> bool {
        self.expires_at <= now_millis
    }
}

pub fn current_time_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let entry = CacheEntry::new("hello", Duration::from_millis(1000), 5_000);
        assert_eq!(entry.expires_at, 6_000);
        assert!(!entry.is_expired(5_999));
        assert!(entry.is_expired(6_000));
    }

    #[test]
    fn test_wire_shape() {
        let entry = CacheEntry::new("hello", Duration::from_secs(1), 0);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"value": "hello", "expiresAt": 1000}));
    }
}
