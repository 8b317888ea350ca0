use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::http_client::HttpClientTrait;
use crate::domain::llm::{
    CallAttempt, Credential, GenerateContentRequest, ProviderResponse, TextGenerationProvider,
};
use crate::domain::DomainError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_TIMEOUT: Duration = Duration::from_secs(60);

const API_KEY_HEADER: &str = "x-goog-api-key";

/// `generateContent` transport.
///
/// One HTTP request per call. The timeout grows with the attempt number
/// (`base_timeout × attempt`) and a timeout on the final attempt is reported
/// as exhausted.
#[derive(Debug)]
pub struct GeminiProvider<C: HttpClientTrait> {
    client: C,
    base_url: String,
    model: String,
    base_timeout: Duration,
}

impl<C: HttpClientTrait> GeminiProvider<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_timeout: DEFAULT_BASE_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_timeout(mut self, timeout: Duration) -> Self {
        self.base_timeout = timeout;
        self
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    pub fn timeout_for(&self, attempt: CallAttempt) -> Duration {
        self.base_timeout.saturating_mul(attempt.number.max(1))
    }
}

#[async_trait]
impl<C: HttpClientTrait> TextGenerationProvider for GeminiProvider<C> {
    async fn generate(
        &self,
        request: &GenerateContentRequest,
        credential: &Credential,
        attempt: CallAttempt,
    ) -> Result<ProviderResponse, DomainError> {
        let body = serde_json::to_value(request)
            .map_err(|e| DomainError::internal(format!("Failed to encode request: {}", e)))?;
        let timeout = self.timeout_for(attempt);
        let headers = vec![
            (API_KEY_HEADER, credential.expose()),
            ("Content-Type", "application/json"),
        ];

        debug!(
            model = %self.model,
            attempt = attempt.number,
            timeout_ms = timeout.as_millis() as u64,
            credential = %credential.masked(),
            "Calling provider"
        );

        match self
            .client
            .post_json(&self.generate_url(), headers, &body, timeout)
            .await
        {
            Ok(json) => ProviderResponse::from_json(json),
            Err(error @ DomainError::Timeout { .. }) if attempt.is_final() => {
                Err(error.into_exhausted())
            }
            Err(error) => Err(error),
        }
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
