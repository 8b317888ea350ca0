//! Backing key-value store trait

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

/// Persistent string key-value store the cache lives in. It may be shared
/// with unrelated keys, so callers are expected to namespace their own.
///
/// Failures are reported as `DomainError::Storage`; a write rejected because
/// the store is full must set `quota_exceeded`.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Single-key atomic write, last writer wins
    async fn set_raw(&self, key: &str, value: &str) -> Result<(), DomainError>;

    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// All keys starting with `prefix`
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, DomainError>;

    /// Approximate bytes used by keys starting with `prefix`
    async fn usage_bytes(&self, prefix: &str) -> Result<u64, DomainError>;

    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-process store with error and quota injection
    #[derive(Debug, Default)]
    pub struct MockKeyValueStore {
        entries: Mutex<HashMap<String, String>>,
        error: Mutex<Option<String>>,
        quota_bytes: Option<u64>,
    }

    impl MockKeyValueStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_raw(self, key: &str, value: &str) -> Self {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            self
        }

        pub fn with_error(self, error: impl Into<String>) -> Self {
            self.set_error(Some(error.into()));
            self
        }

        pub fn with_quota(mut self, bytes: u64) -> Self {
            self.quota_bytes = Some(bytes);
            self
        }

        pub fn set_error(&self, error: Option<String>) {
            *self.error.lock().unwrap() = error;
        }

        pub fn contains(&self, key: &str) -> bool {
            self.entries.lock().unwrap().contains_key(key)
        }

        pub fn raw(&self, key: &str) -> Option<String> {
            self.entries.lock().unwrap().get(key).cloned()
        }

        pub fn len(&self) -> usize {
            self.entries.lock().unwrap().len()
        }

        fn check_error(&self) -> Result<(), DomainError> {
            if let Some(error) = self.error.lock().unwrap().clone() {
                return Err(DomainError::storage(error));
            }
            Ok(())
        }

        fn used(entries: &HashMap<String, String>, prefix: &str) -> u64 {
            entries
                .iter()
                .filter(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| (k.len() + v.len()) as u64)
                .sum()
        }
    }

    #[async_trait]
    impl KeyValueStore for MockKeyValueStore {
        async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
            self.check_error()?;
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set_raw(&self, key: &str, value: &str) -> Result<(), DomainError> {
            self.check_error()?;
            let mut entries = self.entries.lock().unwrap();

            if let Some(quota) = self.quota_bytes {
                let existing = entries.get(key).map(|v| (key.len() + v.len()) as u64).unwrap_or(0);
                let projected = Self::used(&entries, "") - existing + (key.len() + value.len()) as u64;
                if projected > quota {
                    return Err(DomainError::quota_exceeded(format!(
                        "Storage quota of {} bytes exceeded",
                        quota
                    )));
                }
            }

            entries.insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<bool, DomainError> {
            self.check_error()?;
            Ok(self.entries.lock().unwrap().remove(key).is_some())
        }

        async fn keys(&self, prefix: &str) -> Result<Vec<String>, DomainError> {
            self.check_error()?;
            Ok(self
                .entries
                .lock()
                .unwrap()
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect())
        }

        async fn usage_bytes(&self, prefix: &str) -> Result<u64, DomainError> {
            self.check_error()?;
            Ok(Self::used(&self.entries.lock().unwrap(), prefix))
        }

        fn backend_name(&self) -> &'static str {
            "mock"
        }
    }
}
