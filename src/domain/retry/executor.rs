//! Generic retry orchestrator with exponential backoff

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use super::{RetryPolicy, RetryState};
use crate::domain::DomainError;

/// Errors the orchestrator can drive. The orchestrator itself raises the
/// budget-exceeded variant when the overall timeout elapses.
pub trait RetryableError: Clone + Display + Send + Sync {
    /// Error raised when the overall time budget is gone before an attempt starts
    fn budget_exceeded(elapsed: Duration) -> Self;

    /// Minimum wait requested by the remote side, if any
    fn suggested_delay(&self) -> Option<Duration> {
        None
    }
}

impl RetryableError for DomainError {
    fn budget_exceeded(elapsed: Duration) -> Self {
        DomainError::Timeout {
            after: elapsed,
            exhausted: true,
        }
    }

    fn suggested_delay(&self) -> Option<Duration> {
        DomainError::suggested_delay(self)
    }
}

/// Runs a unit of work until it succeeds, the predicate refuses a retry, the
/// attempt budget runs out or the overall timeout elapses.
///
/// Attempts are strictly sequential: attempt N+1 starts only after attempt N
/// failed and its backoff was slept.
#[derive(Debug, Clone)]
pub struct RetryOrchestrator<E> {
    policy: RetryPolicy<E>,
}

impl<E: RetryableError> RetryOrchestrator<E> {
    pub fn new(policy: RetryPolicy<E>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }

    /// Returns the first successful result, or the error that ended the run
    pub async fn run<T, F, Fut>(&self, work: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_with_state(work).await.0
    }

    /// Same as [`run`](Self::run) but also hands back the retry bookkeeping.
    /// `work` receives the 1-based attempt number.
    pub async fn run_with_state<T, F, Fut>(&self, mut work: F) -> (Result<T, E>, RetryState<E>)
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut state = RetryState::new();

        loop {
            let elapsed = state.elapsed();

            if elapsed > self.policy.overall_timeout {
                let error = E::budget_exceeded(elapsed);
                warn!(
                    attempt = state.attempt,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Overall retry budget exceeded"
                );
                state.errors.push(error.clone());
                return (Err(error), state);
            }

            match work(state.attempt).await {
                Ok(value) => {
                    if state.attempt > 1 {
                        debug!(attempt = state.attempt, "Attempt succeeded after retries");
                    }
                    return (Ok(value), state);
                }
                Err(error) => {
                    state.errors.push(error.clone());

                    if state.attempt >= self.policy.max_attempts {
                        debug!(attempt = state.attempt, error = %error, "Attempt budget exhausted");
                        return (Err(error), state);
                    }

                    if !self.policy.should_retry(&error, state.attempt) {
                        debug!(attempt = state.attempt, error = %error, "Error is not retryable");
                        return (Err(error), state);
                    }

                    let delay = self.next_delay(&error, state.attempt);
                    self.policy.observe(&error, state.attempt, delay);

                    warn!(
                        attempt = state.attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed, backing off"
                    );

                    tokio::time::sleep(delay).await;
                    state.record_delay(delay);
                    state.attempt += 1;
                }
            }
        }
    }

    fn next_delay(&self, error: &E, attempt: u32) -> Duration {
        let base = self.policy.delay_for_attempt(attempt);
        let sample: f64 = rand::thread_rng().gen_range(0.0..=1.0);
        let delay = self.policy.apply_jitter(base, sample);

        match error.suggested_delay() {
            Some(suggested) => delay.max(suggested.min(self.policy.max_delay)),
            None => delay,
        }
    }
}
