use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

/// States an invocation moves through. `Success` and `Failure` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Validating,
    CacheLookup,
    Requesting,
    RetryDecision,
    ResponseParsing,
    CacheWrite,
    ReplyInsertion,
    Success,
    Failure,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::CacheLookup => "cache_lookup",
            Self::Requesting => "requesting",
            Self::RetryDecision => "retry_decision",
            Self::ResponseParsing => "response_parsing",
            Self::CacheWrite => "cache_write",
            Self::ReplyInsertion => "reply_insertion",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Ordered record of the states one invocation visited.
///
/// Shared by reference with the retry closure, hence the lock; an invocation
/// is sequential so it is never contended.
#[derive(Debug)]
pub(crate) struct PipelineTrace {
    states: Mutex<Vec<PipelineState>>,
}

impl PipelineTrace {
    pub(crate) fn new() -> Self {
        Self {
            states: Mutex::new(vec![PipelineState::Idle]),
        }
    }

    pub(crate) fn enter(&self, state: PipelineState) {
        debug!(state = state.as_str(), "Pipeline transition");
        if let Ok(mut states) = self.states.lock() {
            states.push(state);
        }
    }

    pub(crate) fn current(&self) -> PipelineState {
        self.states
            .lock()
            .ok()
            .and_then(|s| s.last().copied())
            .unwrap_or(PipelineState::Idle)
    }

    pub(crate) fn into_states(self) -> Vec<PipelineState> {
        self.states.into_inner().unwrap_or_default()
    }
}
