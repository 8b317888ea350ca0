//! Provider transport implementations

mod gemini;
mod http_client;

pub use gemini::{
    GeminiProvider, DEFAULT_BASE_TIMEOUT, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL,
};
pub use http_client::{map_status, parse_retry_after, HttpClient, HttpClientTrait};

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
