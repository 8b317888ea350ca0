//! Domain layer - Core business logic and entities

pub mod cache;
pub mod conversation;
pub mod error;
pub mod failure;
pub mod keep_alive;
pub mod llm;
pub mod pipeline;
pub mod retry;

pub use cache::{CacheEntry, CacheKey, CacheStats, CacheStore, KeyValueStore};
pub use conversation::{ConversationMessage, ConversationSource, InsertionPoint};
pub use error::{DomainError, RATE_LIMIT_MIN_DELAY};
pub use failure::{
    ErrorClassifier, ErrorKind, ErrorRecord, Locale, RecoveryAction, RecoveryActionId,
    RecoveryContext, RecoveryDispatcher, RecoveryEffect, RecoveryHandler,
};
pub use keep_alive::{KeepAliveHandle, KeepAliveSupervisor, LivenessProbe};
pub use llm::{
    CallAttempt, Credential, GenerateContentRequest, ProviderResponse, RequestBuilder,
    RequestConfig, RequestValidator, ResponseExtractor, TextGenerationProvider,
};
pub use pipeline::{
    Pipeline, PipelineInput, PipelineOutcome, PipelineOutput, PipelineReport, PipelineRequest,
    PipelineResult, PipelineState,
};
pub use retry::{RetryOrchestrator, RetryPolicy, RetryState, RetryableError};
