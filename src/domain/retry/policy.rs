//! Retry policy: attempt budget, backoff curve and the retry predicate

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a failed attempt may be retried. Receives the error and
/// the 1-based number of the attempt that produced it.
pub type RetryPredicate<E> = Arc<dyn Fn(&E, u32) -> bool + Send + Sync>;

/// Diagnostics hook invoked with (error, attempt, delay) before each backoff sleep
pub type RetryObserver<E> = Arc<dyn Fn(&E, u32, Duration) + Send + Sync>;

/// Jitter applied around the computed delay, as a fraction of it
pub const JITTER_RATIO: f64 = 0.1;

/// Bounded-attempt exponential backoff policy
pub struct RetryPolicy<E> {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter: bool,
    pub overall_timeout: Duration,
    retry_predicate: RetryPredicate<E>,
    observer: Option<RetryObserver<E>>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            initial_delay: self.initial_delay,
            backoff_factor: self.backoff_factor,
            max_delay: self.max_delay,
            jitter: self.jitter,
            overall_timeout: self.overall_timeout,
            retry_predicate: self.retry_predicate.clone(),
            observer: self.observer.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("backoff_factor", &self.backoff_factor)
            .field("max_delay", &self.max_delay)
            .field("jitter", &self.jitter)
            .field("overall_timeout", &self.overall_timeout)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl<E> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_factor: 2.0,
            max_delay: Duration::from_millis(30_000),
            jitter: true,
            overall_timeout: Duration::from_millis(60_000),
            retry_predicate: Arc::new(|_, _| true),
            observer: None,
        }
    }
}

impl<E> RetryPolicy<E> {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = timeout;
        self
    }

    pub fn with_retry_predicate(
        mut self,
        predicate: impl Fn(&E, u32) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.retry_predicate = Arc::new(predicate);
        self
    }

    pub fn with_observer(mut self, observer: impl Fn(&E, u32, Duration) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn should_retry(&self, error: &E, attempt: u32) -> bool {
        (self.retry_predicate)(error, attempt)
    }

    pub(crate) fn observe(&self, error: &E, attempt: u32, delay: Duration) {
        if let Some(observer) = &self.observer {
            observer(error, attempt, delay);
        }
    }

    /// Pre-jitter delay after the given failed attempt (1-based):
    /// `min(initial * factor^(attempt-1), max)`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_ms = self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(exponent);
        let capped = delay_ms.min(self.max_delay.as_millis() as f64).max(0.0);

        Duration::from_millis(capped as u64)
    }

    /// Applies a ±10% perturbation when jitter is enabled. `sample` is in [0, 1].
    pub fn apply_jitter(&self, delay: Duration, sample: f64) -> Duration {
        if !self.jitter {
            return delay;
        }

        let factor = 1.0 - JITTER_RATIO + 2.0 * JITTER_RATIO * sample.clamp(0.0, 1.0);
        Duration::from_millis((delay.as_millis() as f64 * factor) as u64)
    }
}
