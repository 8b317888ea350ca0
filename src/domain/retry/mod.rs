//! Retry orchestration - bounded attempts with exponential backoff

mod executor;
mod policy;
mod state;

pub use executor::{RetryOrchestrator, RetryableError};
pub use policy::{RetryObserver, RetryPolicy, RetryPredicate, JITTER_RATIO};
pub use state::RetryState;
