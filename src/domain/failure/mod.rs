//! Failure taxonomy, classification and recovery actions

mod classifier;
mod kind;
mod record;
mod recovery;

pub use classifier::{ErrorClassifier, FailureContext};
pub use kind::{ErrorKind, Locale};
pub use record::ErrorRecord;
pub use recovery::{
    RecoveryAction, RecoveryActionId, RecoveryContext, RecoveryDispatcher, RecoveryEffect,
    RecoveryHandler,
};

#[cfg(test)]
pub use recovery::mock::MockRecoveryHandler;
