use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author names treated as the model's own earlier turns
const MODEL_AUTHORS: [&str; 3] = ["model", "assistant", "bot"];

/// One message of the transcript, supplied by the caller per invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub author: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConversationMessage {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn is_model_authored(&self) -> bool {
        let author = self.author.trim();
        MODEL_AUTHORS.iter().any(|m| author.eq_ignore_ascii_case(m))
    }
}
