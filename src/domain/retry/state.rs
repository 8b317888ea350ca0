use std::time::Duration;

use tokio::time::Instant;

/// Bookkeeping for a single orchestrated invocation
#[derive(Debug, Clone)]
pub struct RetryState<E> {
    /// 1-based number of the attempt in flight (or the last one made)
    pub attempt: u32,
    /// Sum of all backoff sleeps
    pub total_delay: Duration,
    /// Every fault observed, in order
    pub errors: Vec<E>,
    /// Delays actually slept, in order
    pub delays: Vec<Duration>,
    pub start_time: Instant,
}

impl<E> RetryState<E> {
    pub fn new() -> Self {
        Self {
            attempt: 1,
            total_delay: Duration::ZERO,
            errors: Vec::new(),
            delays: Vec::new(),
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub(crate) fn record_delay(&mut self, delay: Duration) {
        self.total_delay += delay;
        self.delays.push(delay);
    }

    pub fn last_error(&self) -> Option<&E> {
        self.errors.last()
    }
}

impl<E> Default for RetryState<E> {
    fn default() -> Self {
        Self::new()
    }
}
