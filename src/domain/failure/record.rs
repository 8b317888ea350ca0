use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::ErrorKind;

/// Classified, immutable description of a failure. Only `ErrorClassifier`
/// creates these.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    id: Uuid,
    kind: ErrorKind,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggested_delay_ms: Option<u64>,
    quota_exceeded: bool,
    context: BTreeMap<String, String>,
    timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        kind: ErrorKind,
        message: String,
        status: Option<u16>,
        retryable: bool,
        suggested_delay: Option<Duration>,
        quota_exceeded: bool,
        context: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message,
            status,
            retryable,
            suggested_delay_ms: suggested_delay.map(|d| d.as_millis() as u64),
            quota_exceeded,
            context,
            timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Localized, user-facing message
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn suggested_delay(&self) -> Option<Duration> {
        self.suggested_delay_ms.map(Duration::from_millis)
    }

    pub fn is_quota_exceeded(&self) -> bool {
        self.quota_exceeded
    }

    /// Debug context; never contains credentials
    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
