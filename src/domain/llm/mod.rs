//! Provider request/response models, validation and the provider trait

mod credential;
mod provider;
mod request;
mod response;
mod validation;

pub use credential::{redact_credentials, Credential, CredentialRedactor};
pub use provider::{CallAttempt, TextGenerationProvider};
pub use request::{
    Content, ContentRole, GenerateContentRequest, GenerationConfig, GenerationDefaults, Part,
    RequestBuilder, RequestConfig, SafetySetting, SAFETY_CATEGORIES, SAFETY_THRESHOLD,
};
pub use response::{
    Candidate, PromptFeedback, ProviderResponse, ResponseExtractor, UsageMetadata,
};
pub use validation::{
    RequestValidationError, RequestValidator, DEFAULT_CREDENTIAL_PREFIX, MAX_TEMPERATURE,
    MIN_TEMPERATURE,
};

#[cfg(test)]
pub use provider::mock::MockProvider;
