//! Invocation inputs and outcomes, including the entry contract consumed by
//! the presentation layer

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::PipelineState;
use crate::domain::cache::CacheKey;
use crate::domain::conversation::ConversationMessage;
use crate::domain::failure::{ErrorKind, ErrorRecord, RecoveryAction};
use crate::domain::llm::RequestConfig;
use crate::domain::DomainError;

/// One invocation's inputs
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub messages: Vec<ConversationMessage>,
    pub config: RequestConfig,
    /// Replies are cached only when a key is given
    pub cache_key: Option<CacheKey>,
    pub ttl: Option<Duration>,
}

impl PipelineRequest {
    pub fn new(messages: Vec<ConversationMessage>, config: RequestConfig) -> Self {
        Self {
            messages,
            config,
            cache_key: None,
            ttl: None,
        }
    }

    pub fn with_cache_key(mut self, key: CacheKey) -> Self {
        self.cache_key = Some(key);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Exactly one of these ends every invocation
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Success(String),
    Failure(ErrorRecord),
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Success(text) => Some(text),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        match self {
            Self::Success(_) => None,
            Self::Failure(record) => Some(record),
        }
    }
}

/// Diagnostics for one invocation
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Provider attempts made; 0 when validation failed or the cache hit
    pub attempts: u32,
    pub total_delay: Duration,
    pub delays: Vec<Duration>,
    pub errors: Vec<DomainError>,
    pub cache_hit: bool,
    pub elapsed: Duration,
    pub states: Vec<PipelineState>,
    pub heartbeats: u64,
}

#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub outcome: PipelineOutcome,
    pub actions: Vec<RecoveryAction>,
    pub report: PipelineReport,
    /// Set by `reply_into` when the reply reached the conversation
    pub inserted: bool,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn to_output(&self) -> PipelineOutput {
        PipelineOutput::from(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputMessage {
    pub author: String,
    pub text: String,
}

/// Entry contract input: `{messages: [{author, text}], credential}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineInput {
    pub messages: Vec<InputMessage>,
    #[serde(default)]
    pub credential: String,
}

impl PipelineInput {
    pub fn into_request(self) -> PipelineRequest {
        let messages = self
            .messages
            .into_iter()
            .map(|m| ConversationMessage::new(m.author, m.text))
            .collect();

        PipelineRequest::new(messages, RequestConfig::new(self.credential))
    }
}

/// Entry contract output: `{success, text?, error?}` plus the machine kind
/// and the offered recovery actions
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<RecoveryAction>,
}

impl From<&PipelineResult> for PipelineOutput {
    fn from(result: &PipelineResult) -> Self {
        match &result.outcome {
            PipelineOutcome::Success(text) => Self {
                success: true,
                text: Some(text.clone()),
                error: None,
                kind: None,
                actions: Vec::new(),
            },
            PipelineOutcome::Failure(record) => Self {
                success: false,
                text: None,
                error: Some(record.message().to_string()),
                kind: Some(record.kind()),
                actions: result.actions.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_contract() {
        let input: PipelineInput = serde_json::from_value(json!({
            "messages": [{"author": "user", "text": "Hi"}],
            "credential": "AIzaXXXX"
        }))
        .unwrap();

        let request = input.into_request();
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.config.credential.expose(), "AIzaXXXX");
        assert!(request.cache_key.is_none());
    }

    #[test]
    fn test_success_output_shape() {
        let result = PipelineResult {
            outcome: PipelineOutcome::Success("Hello!".to_string()),
            actions: Vec::new(),
            report: PipelineReport {
                attempts: 1,
                total_delay: Duration::ZERO,
                delays: Vec::new(),
                errors: Vec::new(),
                cache_hit: false,
                elapsed: Duration::ZERO,
                states: Vec::new(),
                heartbeats: 0,
            },
            inserted: false,
        };

        let json = serde_json::to_value(result.to_output()).unwrap();
        assert_eq!(json, json!({"success": true, "text": "Hello!"}));
    }
}
