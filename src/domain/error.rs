use std::time::Duration;

use thiserror::Error;

/// Smallest delay honoured after the provider signals rate limiting
pub const RATE_LIMIT_MIN_DELAY: Duration = Duration::from_secs(5);

/// Faults raised at the exact site where a call can fail.
///
/// Every variant carries enough structure to be classified without looking at
/// the message text.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Bad request ({status}): {message}")]
    BadRequest { status: u16, message: String },

    #[error("Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Provider server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected provider status ({status}): {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("Request timed out after {}ms", after.as_millis())]
    Timeout { after: Duration, exhausted: bool },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Malformed provider response: {message}")]
    MalformedResponse { message: String },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        quota_exceeded: bool,
    },

    #[error("Collaborator error: {message}")]
    Collaborator { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn bad_request(status: u16, message: impl Into<String>) -> Self {
        Self::BadRequest {
            status,
            message: message.into(),
        }
    }

    pub fn auth(status: u16, message: impl Into<String>) -> Self {
        Self::Auth {
            status,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after,
        }
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn unexpected_status(status: u16, message: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            status,
            message: message.into(),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::Timeout {
            after,
            exhausted: false,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            quota_exceeded: false,
        }
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            quota_exceeded: true,
        }
    }

    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::Collaborator {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Marks a timeout as the last one the attempt budget allows
    pub fn into_exhausted(self) -> Self {
        match self {
            Self::Timeout { after, .. } => Self::Timeout {
                after,
                exhausted: true,
            },
            other => other,
        }
    }

    /// HTTP status attached to the fault, if it came from a provider response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest { status, .. }
            | Self::Auth { status, .. }
            | Self::Server { status, .. }
            | Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Minimum wait the provider asked for before the next attempt
    pub fn suggested_delay(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(
                retry_after
                    .map(|d| d.max(RATE_LIMIT_MIN_DELAY))
                    .unwrap_or(RATE_LIMIT_MIN_DELAY),
            ),
            _ => None,
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(
            self,
            Self::Storage {
                quota_exceeded: true,
                ..
            }
        )
    }
}
