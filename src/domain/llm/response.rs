use serde::{Deserialize, Serialize};

use super::{Content, ContentRole, Part};
use crate::domain::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// Decoded provider body. Every field is optional on the wire; emptiness is
/// judged by [`ResponseExtractor`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl ProviderResponse {
    /// Single-candidate response carrying `text`
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some(ContentRole::Model),
                    parts: vec![Part::text(text)],
                }),
                finish_reason: Some("STOP".to_string()),
            }],
            usage_metadata: None,
            prompt_feedback: None,
        }
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, DomainError> {
        serde_json::from_value(value).map_err(|e| {
            DomainError::malformed_response(format!("Failed to parse response: {}", e))
        })
    }
}

/// Pulls the reply text out of `candidates[0].content.parts[0].text`
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseExtractor;

impl ResponseExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, response: &ProviderResponse) -> Result<String, DomainError> {
        let candidate = response.candidates.first().ok_or_else(|| {
            let reason = response
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.as_deref())
                .map(|r| format!("No candidates in response (blocked: {})", r))
                .unwrap_or_else(|| "No candidates in response".to_string());
            DomainError::malformed_response(reason)
        })?;

        let text = candidate
            .content
            .as_ref()
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
            .map(str::trim)
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
            return Err(DomainError::malformed_response(format!(
                "First candidate has no text (finish reason: {})",
                reason
            )));
        }

        Ok(text.to_string())
    }

    pub fn extract_raw(&self, raw: serde_json::Value) -> Result<String, DomainError> {
        self.extract(&ProviderResponse::from_json(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_trimmed_first_candidate() {
        let raw = json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "  Sounds good!\n"}]}, "finishReason": "STOP"},
                {"content": {"role": "model", "parts": [{"text": "second"}]}}
            ],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 4, "totalTokenCount": 7}
        });

        assert_eq!(ResponseExtractor::new().extract_raw(raw).unwrap(), "Sounds good!");
    }

    #[test]
    fn test_empty_candidates_is_malformed() {
        let err = ResponseExtractor::new()
            .extract_raw(json!({"candidates": []}))
            .unwrap_err();
        assert!(matches!(err, DomainError::MalformedResponse { .. }));
    }

    #[test]
    fn test_missing_candidates_mentions_block_reason() {
        let err = ResponseExtractor::new()
            .extract_raw(json!({"promptFeedback": {"blockReason": "SAFETY"}}))
            .unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_whitespace_only_text_is_malformed() {
        let raw = json!({"candidates": [{"content": {"parts": [{"text": "   "}]}, "finishReason": "MAX_TOKENS"}]});
        let err = ResponseExtractor::new().extract_raw(raw).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn test_candidate_without_content() {
        let raw = json!({"candidates": [{"finishReason": "SAFETY"}]});
        assert!(ResponseExtractor::new().extract_raw(raw).is_err());
    }

    #[test]
    fn test_non_object_body_is_malformed() {
        let err = ResponseExtractor::new().extract_raw(json!("oops")).unwrap_err();
        assert!(matches!(err, DomainError::MalformedResponse { .. }));
    }
}
