//! Maps raised faults into the failure taxonomy

use std::collections::BTreeMap;

use super::{ErrorKind, ErrorRecord, Locale};
use crate::domain::llm::CredentialRedactor;
use crate::domain::DomainError;

/// Extra, credential-free debug details attached to a classified failure
#[derive(Debug, Clone, Default)]
pub struct FailureContext {
    entries: BTreeMap<String, String>,
}

impl FailureContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.entries.insert(key.into(), value.to_string());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.entries.insert(key.into(), value.to_string());
    }
}

/// Stateless classifier; the locale only selects the user message language
/// and the redactor scrubs keys from the debug context.
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    locale: Locale,
    redactor: CredentialRedactor,
}

impl ErrorClassifier {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            redactor: CredentialRedactor::default(),
        }
    }

    pub fn with_redactor(mut self, redactor: CredentialRedactor) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn redactor(&self) -> &CredentialRedactor {
        &self.redactor
    }

    pub fn kind_of(&self, error: &DomainError) -> ErrorKind {
        match error {
            DomainError::Configuration { .. } | DomainError::BadRequest { .. } => {
                ErrorKind::ConfigurationError
            }
            DomainError::Auth { .. } => ErrorKind::AuthError,
            DomainError::RateLimited { .. } => ErrorKind::RateLimitError,
            DomainError::Server { .. } | DomainError::Network { .. } => {
                ErrorKind::TransientServerError
            }
            DomainError::Timeout { .. } => ErrorKind::TimeoutError,
            DomainError::MalformedResponse { .. } => ErrorKind::MalformedResponseError,
            DomainError::Storage { .. } => ErrorKind::StorageError,
            DomainError::UnexpectedStatus { .. }
            | DomainError::Collaborator { .. }
            | DomainError::Internal { .. } => ErrorKind::UnknownError,
        }
    }

    /// Whether this particular fault may be retried. Exhausted timeouts and
    /// quota-exceeded storage faults are fatal even though their kinds are not.
    pub fn is_retryable(&self, error: &DomainError) -> bool {
        match error {
            DomainError::Timeout { exhausted, .. } => !exhausted,
            DomainError::Storage { quota_exceeded, .. } => !quota_exceeded,
            other => self.kind_of(other).is_retryable(),
        }
    }

    pub fn classify(&self, error: &DomainError, context: FailureContext) -> ErrorRecord {
        let kind = self.kind_of(error);
        let quota_exceeded = error.is_quota_exceeded();

        let mut entries: BTreeMap<String, String> = context
            .entries
            .into_iter()
            .map(|(k, v)| (k, self.redactor.redact(&v)))
            .collect();
        entries.insert("detail".to_string(), self.redactor.redact(&error.to_string()));

        let message = if quota_exceeded {
            match self.locale {
                Locale::En => "Local storage is full. Clear the reply cache to continue.",
                Locale::Es => "El almacenamiento local está lleno. Borra la caché para continuar.",
            }
        } else {
            kind.user_message(self.locale)
        };

        ErrorRecord::new(
            kind,
            message.to_string(),
            error.status(),
            self.is_retryable(error),
            error.suggested_delay(),
            quota_exceeded,
            entries,
        )
    }
}
