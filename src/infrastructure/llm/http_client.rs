use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;

use crate::domain::llm::CredentialRedactor;
use crate::domain::DomainError;

/// Longest provider error body kept in a fault message
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    /// Sends one JSON POST bounded by `timeout`. Non-2xx statuses come back
    /// as typed faults; nothing is retried here.
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, DomainError>;
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    client: reqwest::Client,
    redactor: CredentialRedactor,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client,
            redactor: CredentialRedactor::default(),
        }
    }

    /// Redaction applied to transport errors and provider error bodies
    pub fn with_redactor(mut self, redactor: CredentialRedactor) -> Self {
        self.redactor = redactor;
        self
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, DomainError> {
        let mut request = self.client.post(url).timeout(timeout);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, timeout, &self.redactor))?;

        let status = response.status();

        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_status(status, retry_after, &error_body, &self.redactor));
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                DomainError::timeout(timeout)
            } else if e.is_decode() {
                DomainError::malformed_response(format!("Response body is not JSON: {}", e))
            } else {
                map_transport_error(e, timeout, &self.redactor)
            }
        })
    }
}

fn map_transport_error(
    error: reqwest::Error,
    timeout: Duration,
    redactor: &CredentialRedactor,
) -> DomainError {
    if error.is_timeout() {
        return DomainError::timeout(timeout);
    }

    let error = error.without_url();
    DomainError::network(redactor.redact(&format!("Request failed: {}", error)))
}

/// Maps a non-success status to its fault:
/// - 400 → bad request
/// - 401/403 → auth
/// - 429 → rate limited, honouring `Retry-After`
/// - 5xx → server
/// - anything else → unexpected status
pub fn map_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
    redactor: &CredentialRedactor,
) -> DomainError {
    let code = status.as_u16();
    let detail = error_detail(status, body, redactor);

    match status {
        StatusCode::BAD_REQUEST => DomainError::bad_request(code, detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DomainError::auth(code, detail),
        StatusCode::TOO_MANY_REQUESTS => DomainError::rate_limited(detail, retry_after),
        s if s.is_server_error() => DomainError::server(code, detail),
        _ => DomainError::unexpected_status(code, detail),
    }
}

/// Provider error message when the body is the usual `{error: {message}}`,
/// otherwise the truncated raw body
fn error_detail(status: StatusCode, body: &str, redactor: &CredentialRedactor) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(MAX_ERROR_BODY_CHARS).collect());

    let message = redactor.redact(message.trim());
    if message.is_empty() {
        status.canonical_reason().unwrap_or("no details").to_string()
    } else {
        message
    }
}

/// `Retry-After` in delta-seconds form
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
