use serde::{Deserialize, Serialize};

use super::Credential;
use crate::domain::conversation::ConversationMessage;

/// Per-call generation settings. Built fresh for every invocation and never
/// persisted with cached replies.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub credential: Credential,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
}

impl RequestConfig {
    pub fn new(credential: impl Into<Credential>) -> Self {
        Self {
            credential: credential.into(),
            temperature: None,
            max_output_tokens: None,
            top_k: None,
            top_p: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

/// Values used for any setting the caller left out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationDefaults {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

/// Role tag of a content block on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ContentRole>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

/// Safety thresholds attached to every request
pub const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
pub const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Provider payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
}

/// Builds provider payloads from a transcript and per-call settings
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    defaults: GenerationDefaults,
}

impl RequestBuilder {
    pub fn new(defaults: GenerationDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &GenerationDefaults {
        &self.defaults
    }

    pub fn build(
        &self,
        messages: &[ConversationMessage],
        config: &RequestConfig,
    ) -> GenerateContentRequest {
        let contents = messages
            .iter()
            .filter(|m| !m.text.trim().is_empty())
            .map(|m| Content {
                role: Some(if m.is_model_authored() {
                    ContentRole::Model
                } else {
                    ContentRole::User
                }),
                parts: vec![Part::text(m.text.clone())],
            })
            .collect();

        let generation_config = GenerationConfig {
            temperature: config.temperature.unwrap_or(self.defaults.temperature),
            top_k: config.top_k.unwrap_or(self.defaults.top_k),
            top_p: config.top_p.unwrap_or(self.defaults.top_p),
            max_output_tokens: config
                .max_output_tokens
                .unwrap_or(self.defaults.max_output_tokens),
        };

        let safety_settings = SAFETY_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: category.to_string(),
                threshold: SAFETY_THRESHOLD.to_string(),
            })
            .collect();

        GenerateContentRequest {
            contents,
            generation_config,
            safety_settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_merges_over_defaults() {
        let config = RequestConfig::new("AIzaXXXX").temperature(0.2);
        let payload = RequestBuilder::default().build(&[ConversationMessage::new("user", "Hi")], &config);

        assert_eq!(payload.generation_config.temperature, 0.2);
        assert_eq!(payload.generation_config.top_k, 40);
        assert_eq!(payload.generation_config.top_p, 0.95);
        assert_eq!(payload.generation_config.max_output_tokens, 1024);
    }

    #[test]
    fn test_build_tags_roles_and_skips_blank() {
        let messages = vec![
            ConversationMessage::new("alice", "Can we meet?"),
            ConversationMessage::new("assistant", "Sure, when?"),
            ConversationMessage::new("alice", "   "),
        ];
        let payload = RequestBuilder::default().build(&messages, &RequestConfig::new("AIzaXXXX"));

        assert_eq!(payload.contents.len(), 2);
        assert_eq!(payload.contents[0].role, Some(ContentRole::User));
        assert_eq!(payload.contents[1].role, Some(ContentRole::Model));
        assert_eq!(payload.contents[1].parts[0].text.as_deref(), Some("Sure, when?"));
    }

    #[test]
    fn test_wire_shape() {
        let payload = RequestBuilder::default().build(
            &[ConversationMessage::new("user", "Hi")],
            &RequestConfig::new("AIzaXXXX").max_output_tokens(64),
        );
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hi");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 64);
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(json["safetySettings"][0]["threshold"], SAFETY_THRESHOLD);
    }

    #[test]
    fn test_credential_not_in_payload() {
        let payload = RequestBuilder::default().build(
            &[ConversationMessage::new("user", "Hi")],
            &RequestConfig::new("AIzaSecretValue"),
        );
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("AIzaSecretValue"));
    }
}
