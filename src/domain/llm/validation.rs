//! Request validation - every violation is fatal and never retried

use thiserror::Error;

use super::RequestConfig;
use crate::domain::conversation::ConversationMessage;
use crate::domain::DomainError;

pub const DEFAULT_CREDENTIAL_PREFIX: &str = "AIza";
pub const MIN_TEMPERATURE: f32 = 0.0;
pub const MAX_TEMPERATURE: f32 = 2.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestValidationError {
    #[error("API key cannot be empty")]
    EmptyCredential,

    #[error("API key must start with '{0}'")]
    CredentialPrefix(String),

    #[error("API key contains invalid character: '{0}'")]
    CredentialCharacter(char),

    #[error("temperature must be between 0 and 2, got {0}")]
    TemperatureOutOfRange(f32),

    #[error("maxOutputTokens must be at least 1")]
    MaxOutputTokensTooSmall,

    #[error("topP must be between 0 and 1, got {0}")]
    TopPOutOfRange(f32),

    #[error("topK must be at least 1")]
    TopKTooSmall,

    #[error("conversation has no messages with text")]
    EmptyConversation,
}

impl From<RequestValidationError> for DomainError {
    fn from(error: RequestValidationError) -> Self {
        DomainError::configuration(error.to_string())
    }
}

/// Checks credential shape and parameter ranges before anything is sent
#[derive(Debug, Clone)]
pub struct RequestValidator {
    credential_prefix: String,
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::new(DEFAULT_CREDENTIAL_PREFIX)
    }
}

impl RequestValidator {
    pub fn new(credential_prefix: impl Into<String>) -> Self {
        Self {
            credential_prefix: credential_prefix.into(),
        }
    }

    /// Rules:
    /// - credential non-empty, starts with the provider prefix, followed by
    ///   at least one of `[0-9A-Za-z_-]`
    /// - temperature in [0, 2]
    /// - maxOutputTokens >= 1
    /// - topP in [0, 1], topK >= 1
    pub fn validate(&self, config: &RequestConfig) -> Result<(), RequestValidationError> {
        self.validate_credential(config.credential.expose())?;

        if let Some(temperature) = config.temperature {
            if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
                return Err(RequestValidationError::TemperatureOutOfRange(temperature));
            }
        }

        if config.max_output_tokens == Some(0) {
            return Err(RequestValidationError::MaxOutputTokensTooSmall);
        }

        if let Some(top_p) = config.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(RequestValidationError::TopPOutOfRange(top_p));
            }
        }

        if config.top_k == Some(0) {
            return Err(RequestValidationError::TopKTooSmall);
        }

        Ok(())
    }

    pub fn validate_messages(
        &self,
        messages: &[ConversationMessage],
    ) -> Result<(), RequestValidationError> {
        if messages.iter().all(|m| m.text.trim().is_empty()) {
            return Err(RequestValidationError::EmptyConversation);
        }
        Ok(())
    }

    fn validate_credential(&self, key: &str) -> Result<(), RequestValidationError> {
        if key.is_empty() {
            return Err(RequestValidationError::EmptyCredential);
        }

        let rest = key
            .strip_prefix(self.credential_prefix.as_str())
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| RequestValidationError::CredentialPrefix(self.credential_prefix.clone()))?;

        if let Some(c) = rest
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(RequestValidationError::CredentialCharacter(c));
        }

        Ok(())
    }
}
