//! Recovery effects carried out from the terminal

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::cli::CREDENTIAL_ENV;
use crate::domain::{CacheStore, DomainError, RecoveryHandler};

/// Prints guidance to stderr, clears the configured cache and flags retries
/// for the generate loop to pick up.
#[derive(Debug)]
pub struct TerminalRecovery {
    cache: Option<CacheStore>,
    retry_requested: AtomicBool,
}

impl TerminalRecovery {
    pub fn new(cache: Option<CacheStore>) -> Self {
        Self {
            cache,
            retry_requested: AtomicBool::new(false),
        }
    }

    /// Consumes a pending retry request
    pub fn take_retry(&self) -> bool {
        self.retry_requested.swap(false, Ordering::SeqCst)
    }
}

#[async_trait]
impl RecoveryHandler for TerminalRecovery {
    async fn open_credential_settings(&self) -> Result<(), DomainError> {
        eprintln!(
            "Set a valid API key with --credential or the {} environment variable.",
            CREDENTIAL_ENV
        );
        Ok(())
    }

    async fn open_storage_help(&self) -> Result<(), DomainError> {
        eprintln!(
            "The reply cache is full. Run `reply-pipeline sweep --clear` or raise cache.quota_bytes."
        );
        Ok(())
    }

    async fn clear_cache(&self) -> Result<usize, DomainError> {
        match &self.cache {
            Some(cache) => cache.clear().await,
            None => Ok(0),
        }
    }

    async fn retry(&self) -> Result<(), DomainError> {
        self.retry_requested.store(true, Ordering::SeqCst);
        Ok(())
    }
}
