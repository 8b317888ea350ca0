//! Recovery actions offered to the presentation layer for a classified failure

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use super::{ErrorKind, ErrorRecord, Locale};
use crate::domain::DomainError;

/// Stable identifiers of the actions the presentation layer can render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryActionId {
    OpenCredentialSettings,
    RetryAfterSuggestedDelay,
    ClearCache,
    OpenStorageHelp,
    Retry,
}

impl RecoveryActionId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenCredentialSettings => "open-credential-settings",
            Self::RetryAfterSuggestedDelay => "retry-after-suggested-delay",
            Self::ClearCache => "clear-cache",
            Self::OpenStorageHelp => "open-storage-help",
            Self::Retry => "retry",
        }
    }

    fn label(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::OpenCredentialSettings, Locale::En) => "Open API key settings",
            (Self::OpenCredentialSettings, Locale::Es) => "Abrir ajustes de la clave",
            (Self::RetryAfterSuggestedDelay, Locale::En) => "Retry in a moment",
            (Self::RetryAfterSuggestedDelay, Locale::Es) => "Reintentar en un momento",
            (Self::ClearCache, Locale::En) => "Clear reply cache",
            (Self::ClearCache, Locale::Es) => "Borrar caché de respuestas",
            (Self::OpenStorageHelp, Locale::En) => "Storage help",
            (Self::OpenStorageHelp, Locale::Es) => "Ayuda de almacenamiento",
            (Self::Retry, Locale::En) => "Try again",
            (Self::Retry, Locale::Es) => "Intentar de nuevo",
        }
    }
}

/// What an action does once triggered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecoveryEffect {
    OpenCredentialSettings,
    Retry {
        #[serde(skip_serializing_if = "Option::is_none")]
        delay_ms: Option<u64>,
    },
    ClearCache,
    OpenStorageHelp,
}

/// Operations the hosting presentation layer provides to carry out effects
#[async_trait]
pub trait RecoveryHandler: Send + Sync {
    async fn open_credential_settings(&self) -> Result<(), DomainError>;

    async fn open_storage_help(&self) -> Result<(), DomainError>;

    /// Returns the number of removed cache entries
    async fn clear_cache(&self) -> Result<usize, DomainError>;

    async fn retry(&self) -> Result<(), DomainError>;
}

/// A user-triggerable recovery action. Nothing runs until [`trigger`](Self::trigger)
/// is called by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryAction {
    pub id: RecoveryActionId,
    pub label: String,
    pub effect: RecoveryEffect,
    pub is_primary: bool,
}

impl RecoveryAction {
    fn new(id: RecoveryActionId, effect: RecoveryEffect, is_primary: bool, locale: Locale) -> Self {
        Self {
            id,
            label: id.label(locale).to_string(),
            effect,
            is_primary,
        }
    }

    pub async fn trigger(&self, handler: &dyn RecoveryHandler) -> Result<(), DomainError> {
        info!(action = self.id.as_str(), "Recovery action triggered");

        match &self.effect {
            RecoveryEffect::OpenCredentialSettings => handler.open_credential_settings().await,
            RecoveryEffect::OpenStorageHelp => handler.open_storage_help().await,
            RecoveryEffect::ClearCache => {
                let removed = handler.clear_cache().await?;
                info!(removed, "Reply cache cleared");
                Ok(())
            }
            RecoveryEffect::Retry { delay_ms } => {
                if let Some(ms) = delay_ms {
                    tokio::time::sleep(Duration::from_millis(*ms)).await;
                }
                handler.retry().await
            }
        }
    }
}

/// Inputs beyond the record that shape the offered actions
#[derive(Debug, Clone, Copy)]
pub struct RecoveryContext {
    pub locale: Locale,
    /// False when the caller has nothing to replay, which hides retry actions
    pub can_retry: bool,
}

impl Default for RecoveryContext {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            can_retry: true,
        }
    }
}

impl RecoveryContext {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            ..Default::default()
        }
    }

    pub fn without_retry(mut self) -> Self {
        self.can_retry = false;
        self
    }
}

/// Deterministic mapping from classified failures to recovery actions
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryDispatcher;

impl RecoveryDispatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn actions_for(&self, record: &ErrorRecord, context: RecoveryContext) -> Vec<RecoveryAction> {
        let locale = context.locale;

        match record.kind() {
            ErrorKind::AuthError => vec![RecoveryAction::new(
                RecoveryActionId::OpenCredentialSettings,
                RecoveryEffect::OpenCredentialSettings,
                true,
                locale,
            )],
            ErrorKind::RateLimitError if context.can_retry => vec![RecoveryAction::new(
                RecoveryActionId::RetryAfterSuggestedDelay,
                RecoveryEffect::Retry {
                    delay_ms: record.suggested_delay().map(|d| d.as_millis() as u64),
                },
                true,
                locale,
            )],
            ErrorKind::StorageError if record.is_quota_exceeded() => vec![
                RecoveryAction::new(
                    RecoveryActionId::ClearCache,
                    RecoveryEffect::ClearCache,
                    true,
                    locale,
                ),
                RecoveryAction::new(
                    RecoveryActionId::OpenStorageHelp,
                    RecoveryEffect::OpenStorageHelp,
                    false,
                    locale,
                ),
            ],
            _ if record.is_retryable() && context.can_retry => vec![RecoveryAction::new(
                RecoveryActionId::Retry,
                RecoveryEffect::Retry { delay_ms: None },
                true,
                locale,
            )],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Records which effects were carried out
    #[derive(Debug, Default)]
    pub struct MockRecoveryHandler {
        pub calls: Mutex<Vec<&'static str>>,
    }

    impl MockRecoveryHandler {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecoveryHandler for MockRecoveryHandler {
        async fn open_credential_settings(&self) -> Result<(), DomainError> {
            self.calls.lock().unwrap().push("open_credential_settings");
            Ok(())
        }

        async fn open_storage_help(&self) -> Result<(), DomainError> {
            self.calls.lock().unwrap().push("open_storage_help");
            Ok(())
        }

        async fn clear_cache(&self) -> Result<usize, DomainError> {
            self.calls.lock().unwrap().push("clear_cache");
            Ok(3)
        }

        async fn retry(&self) -> Result<(), DomainError> {
            self.calls.lock().unwrap().push("retry");
            Ok(())
        }
    }
}
