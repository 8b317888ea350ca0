//! Reply generation pipeline

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use super::state::PipelineTrace;
use super::{
    PipelineInput, PipelineOutcome, PipelineOutput, PipelineReport, PipelineRequest,
    PipelineResult, PipelineState,
};
use crate::domain::cache::{CacheKey, CacheStore};
use crate::domain::conversation::ConversationSource;
use crate::domain::failure::{
    ErrorClassifier, ErrorRecord, FailureContext, Locale, RecoveryAction, RecoveryContext,
    RecoveryDispatcher,
};
use crate::domain::keep_alive::KeepAliveSupervisor;
use crate::domain::llm::{
    CallAttempt, Credential, CredentialRedactor, GenerateContentRequest, RequestBuilder,
    RequestConfig, RequestValidator, ResponseExtractor, TextGenerationProvider,
};
use crate::domain::retry::{RetryOrchestrator, RetryPolicy, RetryState};
use crate::domain::DomainError;

/// What `execute` hands back before classification
struct Execution {
    result: Result<String, DomainError>,
    attempts: u32,
    delays: Vec<Duration>,
    total_delay: Duration,
    errors: Vec<DomainError>,
    cache_hit: bool,
}

impl Execution {
    fn failed(error: DomainError) -> Self {
        Self {
            errors: vec![error.clone()],
            result: Err(error),
            attempts: 0,
            delays: Vec::new(),
            total_delay: Duration::ZERO,
            cache_hit: false,
        }
    }

    fn cached(text: String) -> Self {
        Self {
            result: Ok(text),
            attempts: 0,
            delays: Vec::new(),
            total_delay: Duration::ZERO,
            errors: Vec::new(),
            cache_hit: true,
        }
    }

    fn from_retry(
        result: Result<String, DomainError>,
        state: RetryState<DomainError>,
        attempts: u32,
    ) -> Self {
        Self {
            result,
            attempts,
            delays: state.delays,
            total_delay: state.total_delay,
            errors: state.errors,
            cache_hit: false,
        }
    }
}

/// Composes validation, the reply cache, the retried provider call, response
/// extraction and failure classification into one state machine.
///
/// Every invocation ends in exactly one [`PipelineOutcome`]; a heartbeat runs
/// for its whole duration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    provider: Arc<dyn TextGenerationProvider>,
    cache: Option<CacheStore>,
    validator: RequestValidator,
    builder: RequestBuilder,
    extractor: ResponseExtractor,
    classifier: ErrorClassifier,
    dispatcher: RecoveryDispatcher,
    keep_alive: KeepAliveSupervisor,
    retry_policy: RetryPolicy<DomainError>,
}

impl Pipeline {
    pub fn new(provider: Arc<dyn TextGenerationProvider>) -> Self {
        Self {
            provider,
            cache: None,
            validator: RequestValidator::default(),
            builder: RequestBuilder::default(),
            extractor: ResponseExtractor::new(),
            classifier: ErrorClassifier::default(),
            dispatcher: RecoveryDispatcher::new(),
            keep_alive: KeepAliveSupervisor::default(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_validator(mut self, validator: RequestValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_request_builder(mut self, builder: RequestBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.classifier =
            ErrorClassifier::new(locale).with_redactor(self.classifier.redactor().clone());
        self
    }

    /// Credential prefix for both request validation and redaction of
    /// failure context
    pub fn with_credential_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.classifier = self
            .classifier
            .with_redactor(CredentialRedactor::new(&prefix));
        self.validator = RequestValidator::new(prefix);
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: KeepAliveSupervisor) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Backoff settings. The retry predicate is always replaced by the
    /// classifier's retryability.
    pub fn with_retry_policy(mut self, policy: RetryPolicy<DomainError>) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    pub fn locale(&self) -> Locale {
        self.classifier.locale()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Entry contract: `{messages, credential}` in, `{success, text?, error?}` out
    pub async fn handle(&self, input: PipelineInput) -> PipelineOutput {
        self.run(input.into_request()).await.to_output()
    }

    pub async fn run(&self, request: PipelineRequest) -> PipelineResult {
        self.drive(request, None).await
    }

    /// Pulls the transcript from `source`, generates a reply (cached per
    /// channel and thread when the source knows its thread) and inserts it.
    /// Insertion is the last step before the terminal state.
    pub async fn reply_into(
        &self,
        source: &dyn ConversationSource,
        config: RequestConfig,
    ) -> PipelineResult {
        let messages = match source.extract_messages().await {
            Ok(messages) => messages,
            Err(e) => {
                return self.settle(
                    Execution::failed(e),
                    PipelineTrace::new(),
                    Instant::now(),
                    0,
                    None,
                );
            }
        };

        let mut request = PipelineRequest::new(messages, config);
        if let Some(thread_id) = source.thread_id().await {
            request = request.with_cache_key(CacheKey::new(source.channel(), thread_id));
        }

        self.drive(request, Some(source)).await
    }

    async fn drive(
        &self,
        request: PipelineRequest,
        source: Option<&dyn ConversationSource>,
    ) -> PipelineResult {
        let started = Instant::now();
        let trace = PipelineTrace::new();
        let heartbeat = self.keep_alive.start();

        let mut execution = self.execute(&request, &trace).await;

        let mut inserted = false;
        let generated = execution.result.as_ref().ok().cloned();
        if let (Some(source), Some(text)) = (source, generated) {
            trace.enter(PipelineState::ReplyInsertion);
            match insert(source, &text).await {
                Ok(done) => inserted = done,
                Err(error) => {
                    execution.errors.push(error.clone());
                    execution.result = Err(error);
                }
            }
        }

        let heartbeats = self.keep_alive.stop(heartbeat);
        let mut result =
            self.settle(execution, trace, started, heartbeats, request.cache_key.as_ref());
        result.inserted = inserted;
        result
    }

    async fn execute(&self, request: &PipelineRequest, trace: &PipelineTrace) -> Execution {
        trace.enter(PipelineState::Validating);
        if let Err(e) = self.validate(request) {
            return Execution::failed(e);
        }

        let cache = self.cache.as_ref().zip(request.cache_key.as_ref());

        if let Some((store, key)) = cache {
            trace.enter(PipelineState::CacheLookup);
            match store.get(key).await {
                Ok(Some(text)) => {
                    info!(key = %key, "Serving cached reply");
                    return Execution::cached(text);
                }
                Ok(None) => {}
                Err(e) => warn!(key = %key, error = %e, "Cache lookup failed, treating as miss"),
            }
        }

        let payload = self.builder.build(&request.messages, &request.config);
        let mut execution = self
            .request_with_retry(&payload, &request.config.credential, trace)
            .await;

        let text = match &execution.result {
            Ok(text) => text.clone(),
            Err(_) => return execution,
        };

        if let Some((store, key)) = cache {
            trace.enter(PipelineState::CacheWrite);
            if let Err(e) = store.set(key, &text, request.ttl).await {
                if e.is_quota_exceeded() {
                    warn!(key = %key, "Cache quota exceeded, user must clear the cache");
                    execution.errors.push(e.clone());
                    execution.result = Err(e);
                } else {
                    warn!(key = %key, error = %e, "Cache write skipped");
                }
            }
        }

        execution
    }

    fn validate(&self, request: &PipelineRequest) -> Result<(), DomainError> {
        self.validator.validate(&request.config)?;
        self.validator.validate_messages(&request.messages)?;
        Ok(())
    }

    async fn request_with_retry(
        &self,
        payload: &GenerateContentRequest,
        credential: &Credential,
        trace: &PipelineTrace,
    ) -> Execution {
        let classifier = self.classifier.clone();
        let policy = self
            .retry_policy
            .clone()
            .with_retry_predicate(move |error: &DomainError, _| classifier.is_retryable(error));
        let max_attempts = policy.max_attempts;
        let orchestrator = RetryOrchestrator::new(policy);

        let provider = self.provider.as_ref();
        let extractor = self.extractor;
        let made = AtomicU32::new(0);
        let made_ref = &made;

        let (result, state) = orchestrator
            .run_with_state(move |attempt| async move {
                made_ref.fetch_add(1, Ordering::SeqCst);
                trace.enter(PipelineState::Requesting);

                let response = match provider
                    .generate(payload, credential, CallAttempt::new(attempt, max_attempts))
                    .await
                {
                    Ok(response) => response,
                    Err(e) => {
                        trace.enter(PipelineState::RetryDecision);
                        return Err(e);
                    }
                };

                trace.enter(PipelineState::ResponseParsing);
                extractor
                    .extract(&response)
                    .inspect_err(|_| trace.enter(PipelineState::RetryDecision))
            })
            .await;

        Execution::from_retry(result, state, made.load(Ordering::SeqCst))
    }

    fn settle(
        &self,
        execution: Execution,
        trace: PipelineTrace,
        started: Instant,
        heartbeats: u64,
        cache_key: Option<&CacheKey>,
    ) -> PipelineResult {
        let (outcome, actions) = match execution.result {
            Ok(text) => {
                trace.enter(PipelineState::Success);
                info!(
                    attempts = execution.attempts,
                    cache_hit = execution.cache_hit,
                    "Reply generated"
                );
                (PipelineOutcome::Success(text), Vec::new())
            }
            Err(error) => {
                let failed_in = trace.current();
                trace.enter(PipelineState::Failure);
                let (record, actions) =
                    self.classify(&error, failed_in, execution.attempts, cache_key);
                (PipelineOutcome::Failure(record), actions)
            }
        };

        PipelineResult {
            outcome,
            actions,
            report: PipelineReport {
                attempts: execution.attempts,
                total_delay: execution.total_delay,
                delays: execution.delays,
                errors: execution.errors,
                cache_hit: execution.cache_hit,
                elapsed: started.elapsed(),
                states: trace.into_states(),
                heartbeats,
            },
            inserted: false,
        }
    }

    fn classify(
        &self,
        error: &DomainError,
        failed_in: PipelineState,
        attempts: u32,
        cache_key: Option<&CacheKey>,
    ) -> (ErrorRecord, Vec<RecoveryAction>) {
        let mut context = FailureContext::new()
            .with("state", failed_in.as_str())
            .with("attempts", attempts)
            .with("provider", self.provider.provider_name());
        if let Some(key) = cache_key {
            context.insert("cacheKey", key);
        }

        let record = self.classifier.classify(error, context);
        warn!(
            kind = record.kind().as_str(),
            status = record.status(),
            retryable = record.is_retryable(),
            attempts,
            "Pipeline failed"
        );

        let actions = self
            .dispatcher
            .actions_for(&record, RecoveryContext::new(self.classifier.locale()));
        (record, actions)
    }
}

/// Inserts `text` when the source offers an insertion point
async fn insert(source: &dyn ConversationSource, text: &str) -> Result<bool, DomainError> {
    match source.find_insertion_point().await? {
        Some(_) => {
            source.insert_reply(text).await?;
            Ok(true)
        }
        None => {
            warn!(channel = source.channel(), "No insertion point, reply not inserted");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockKeyValueStore;
    use crate::domain::conversation::{ConversationMessage, MockConversationSource};
    use crate::domain::failure::{ErrorKind, RecoveryActionId};
    use crate::domain::keep_alive::MockLivenessProbe;
    use crate::domain::llm::{MockProvider, ProviderResponse};
    use crate::domain::pipeline::InputMessage;

    fn hi() -> Vec<ConversationMessage> {
        vec![ConversationMessage::new("user", "Hi")]
    }

    fn request() -> PipelineRequest {
        PipelineRequest::new(hi(), RequestConfig::new("AIzaXXXX").temperature(0.7))
    }

    fn pipeline(provider: Arc<MockProvider>) -> Pipeline {
        Pipeline::new(provider)
    }

    fn cached_pipeline(provider: Arc<MockProvider>, backend: Arc<MockKeyValueStore>) -> Pipeline {
        Pipeline::new(provider).with_cache(CacheStore::new(backend))
    }

    #[tokio::test(start_paused = true)]
    async fn test_hi_returns_trimmed_reply() {
        let provider = Arc::new(MockProvider::new().then_text("  Hello! How can I help?\n"));

        let output = pipeline(provider.clone())
            .handle(PipelineInput {
                messages: vec![InputMessage {
                    author: "user".to_string(),
                    text: "Hi".to_string(),
                }],
                credential: "AIzaXXXX".to_string(),
            })
            .await;

        assert!(output.success);
        assert_eq!(output.text.as_deref(), Some("Hello! How can I help?"));
        assert!(output.error.is_none());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_twice_then_success() {
        let provider = Arc::new(
            MockProvider::new()
                .then_error(DomainError::rate_limited("slow down", None))
                .then_error(DomainError::rate_limited("slow down", None))
                .then_text("Finally"),
        );

        let result = pipeline(provider.clone()).run(request()).await;

        assert_eq!(result.outcome.text(), Some("Finally"));
        assert_eq!(result.report.attempts, 3);
        assert_eq!(result.report.delays.len(), 2);
        assert!(result.report.delays.iter().all(|d| *d >= Duration::from_secs(5)));
        assert_eq!(
            provider.calls(),
            vec![CallAttempt::new(1, 3), CallAttempt::new(2, 3), CallAttempt::new(3, 3)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_candidates_exhaust_budget() {
        let provider = Arc::new(MockProvider::new().always(Ok(ProviderResponse::default())));

        let result = pipeline(provider.clone()).run(request()).await;

        let record = result.outcome.error().unwrap();
        assert_eq!(record.kind(), ErrorKind::MalformedResponseError);
        assert_eq!(result.report.attempts, 3);
        assert_eq!(provider.call_count(), 3);
        assert_eq!(result.actions[0].id, RecoveryActionId::Retry);
        assert_eq!(result.report.states.last(), Some(&PipelineState::Failure));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_error_is_not_retried() {
        let provider = Arc::new(MockProvider::new().always(Err(DomainError::auth(401, "bad key"))));

        let result = pipeline(provider.clone())
            .with_retry_policy(RetryPolicy::new(5))
            .run(request())
            .await;

        let record = result.outcome.error().unwrap();
        assert_eq!(record.kind(), ErrorKind::AuthError);
        assert_eq!(record.status(), Some(401));
        assert_eq!(provider.call_count(), 1);
        assert!(result.report.delays.is_empty());
        assert_eq!(result.actions.len(), 1);
        assert_eq!(result.actions[0].id, RecoveryActionId::OpenCredentialSettings);
        assert!(result.actions[0].is_primary);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_never_calls_provider() {
        let provider = Arc::new(MockProvider::new().then_text("unused"));
        let request = PipelineRequest::new(hi(), RequestConfig::new("sk-wrong"));

        let result = pipeline(provider.clone()).run(request).await;

        assert_eq!(result.outcome.error().unwrap().kind(), ErrorKind::ConfigurationError);
        assert_eq!(result.report.attempts, 0);
        assert_eq!(provider.call_count(), 0);
        assert!(result.actions.is_empty());
        assert_eq!(
            result.report.states,
            vec![PipelineState::Idle, PipelineState::Validating, PipelineState::Failure]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_timeout_is_fatal() {
        let provider = Arc::new(
            MockProvider::new().then_error(DomainError::timeout(Duration::from_secs(60)).into_exhausted()),
        );

        let result = pipeline(provider.clone()).run(request()).await;

        let record = result.outcome.error().unwrap();
        assert_eq!(record.kind(), ErrorKind::TimeoutError);
        assert!(!record.is_retryable());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overall_timeout_stops_retrying() {
        let provider = Arc::new(
            MockProvider::new()
                .always(Err(DomainError::server(503, "unavailable")))
                .with_latency(Duration::from_secs(4)),
        );

        let result = pipeline(provider.clone())
            .with_retry_policy(RetryPolicy::new(3).with_overall_timeout(Duration::from_secs(3)))
            .run(request())
            .await;

        let record = result.outcome.error().unwrap();
        assert_eq!(record.kind(), ErrorKind::TimeoutError);
        assert!(!record.is_retryable());
        assert_eq!(provider.call_count(), 1);
        assert_eq!(result.report.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_cached_and_served() {
        let backend = Arc::new(MockKeyValueStore::new());
        let provider = Arc::new(MockProvider::new().then_text("Cached reply"));
        let pipeline = cached_pipeline(provider.clone(), backend.clone());
        let key = CacheKey::new("mail", "t1");

        let first = pipeline.run(request().with_cache_key(key.clone())).await;
        assert!(!first.report.cache_hit);
        assert!(backend.contains("cache_mail_t1"));

        let second = pipeline.run(request().with_cache_key(key)).await;
        assert!(second.report.cache_hit);
        assert_eq!(second.outcome.text(), Some("Cached reply"));
        assert_eq!(provider.call_count(), 1);
        assert!(!backend.raw("cache_mail_t1").unwrap().contains("AIzaXXXX"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_errors_degrade_to_miss() {
        let backend = Arc::new(MockKeyValueStore::new().with_error("store offline"));
        let provider = Arc::new(MockProvider::new().then_text("Uncached"));

        let result = cached_pipeline(provider.clone(), backend)
            .run(request().with_cache_key(CacheKey::new("mail", "t1")))
            .await;

        assert_eq!(result.outcome.text(), Some("Uncached"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_exceeded_on_write_is_fatal() {
        let backend = Arc::new(MockKeyValueStore::new().with_quota(8));
        let provider = Arc::new(MockProvider::new().then_text("A reply too large to store"));

        let result = cached_pipeline(provider, backend)
            .run(request().with_cache_key(CacheKey::new("mail", "t1")))
            .await;

        let record = result.outcome.error().unwrap();
        assert_eq!(record.kind(), ErrorKind::StorageError);
        assert!(record.is_quota_exceeded());
        assert!(!record.is_retryable());
        let ids: Vec<_> = result.actions.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![RecoveryActionId::ClearCache, RecoveryActionId::OpenStorageHelp]);
        assert_eq!(record.context().get("state").map(String::as_str), Some("cache_write"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_runs_during_slow_call() {
        let probe = Arc::new(MockLivenessProbe::new());
        let provider = Arc::new(
            MockProvider::new()
                .then_text("slow")
                .with_latency(Duration::from_secs(12)),
        );

        let result = pipeline(provider)
            .with_keep_alive(KeepAliveSupervisor::default().with_probe(probe.clone()))
            .run(request())
            .await;

        assert!(result.is_success());
        assert_eq!(result.report.heartbeats, 2);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(probe.beats(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_context_has_no_credential() {
        let provider = Arc::new(
            MockProvider::new().always(Err(DomainError::bad_request(400, "key=AIzaXXXX rejected"))),
        );

        let result = pipeline(provider).run(request()).await;

        let json = serde_json::to_string(result.outcome.error().unwrap()).unwrap();
        assert!(!json.contains("AIzaXXXX"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_credential_prefix_drives_validation_and_redaction() {
        let rejected = DomainError::bad_request(400, "key=corp_secret9 rejected");
        let provider = Arc::new(MockProvider::new().always(Err(rejected)));

        let result = pipeline(provider)
            .with_credential_prefix("corp_")
            .with_locale(Locale::Es)
            .run(PipelineRequest::new(hi(), RequestConfig::new("corp_secret9")))
            .await;

        let record = result.outcome.error().unwrap();
        assert_eq!(record.kind(), ErrorKind::ConfigurationError);
        assert_eq!(result.report.attempts, 1);
        assert!(!serde_json::to_string(record).unwrap().contains("corp_secret9"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_into_inserts_and_caches_by_thread() {
        let backend = Arc::new(MockKeyValueStore::new());
        let provider = Arc::new(MockProvider::new().then_text("See you then"));
        let source = MockConversationSource::new("mail")
            .with_message("alice", "Lunch at noon?")
            .with_thread("t-9");

        let result = cached_pipeline(provider, backend.clone())
            .reply_into(&source, RequestConfig::new("AIzaXXXX"))
            .await;

        assert!(result.inserted);
        assert_eq!(source.inserted(), vec!["See you then".to_string()]);
        assert!(backend.contains("cache_mail_t-9"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_into_without_thread_skips_cache() {
        let backend = Arc::new(MockKeyValueStore::new());
        let provider = Arc::new(MockProvider::new().then_text("Sure"));
        let source = MockConversationSource::new("chat").with_message("bob", "Ping");

        let result = cached_pipeline(provider, backend.clone())
            .reply_into(&source, RequestConfig::new("AIzaXXXX"))
            .await;

        assert!(result.inserted);
        assert_eq!(backend.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_into_insert_failure_ends_in_failure_only() {
        let provider = Arc::new(MockProvider::new().then_text("Sure"));
        let source = MockConversationSource::new("chat")
            .with_message("bob", "Ping")
            .with_insert_error("compose box closed");

        let result = pipeline(provider)
            .reply_into(&source, RequestConfig::new("AIzaXXXX"))
            .await;

        assert!(!result.is_success());
        assert!(!result.inserted);
        assert_eq!(result.outcome.error().unwrap().kind(), ErrorKind::UnknownError);

        let states = &result.report.states;
        assert_eq!(states.iter().filter(|s| s.is_terminal()).count(), 1);
        assert_eq!(
            &states[states.len() - 2..],
            &[PipelineState::ReplyInsertion, PipelineState::Failure]
        );
        assert_eq!(
            result.outcome.error().unwrap().context().get("state"),
            Some(&"reply_insertion".to_string())
        );
    }

    #[tokio::test]
    async fn test_reply_into_without_insertion_point() {
        let provider = Arc::new(MockProvider::new().then_text("Sure"));
        let source = MockConversationSource::new("chat")
            .with_message("bob", "Ping")
            .without_insertion_point();

        let result = pipeline(provider)
            .reply_into(&source, RequestConfig::new("AIzaXXXX"))
            .await;

        assert!(result.is_success());
        assert!(!result.inserted);
        assert!(source.inserted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spanish_messages() {
        let provider = Arc::new(MockProvider::new().then_error(DomainError::auth(403, "denied")));

        let result = pipeline(provider)
            .with_locale(Locale::Es)
            .run(request())
            .await;

        let record = result.outcome.error().unwrap();
        assert_eq!(record.message(), ErrorKind::AuthError.user_message(Locale::Es));
        assert_eq!(result.actions[0].label, "Abrir ajustes de la clave");
    }
}
