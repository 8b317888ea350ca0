use std::fmt::Debug;

use async_trait::async_trait;

use super::{Credential, GenerateContentRequest, ProviderResponse};
use crate::domain::DomainError;

/// Position of a call inside the shared attempt budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallAttempt {
    /// 1-based
    pub number: u32,
    pub max_attempts: u32,
}

impl CallAttempt {
    pub fn new(number: u32, max_attempts: u32) -> Self {
        Self {
            number: number.max(1),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn is_final(&self) -> bool {
        self.number >= self.max_attempts
    }
}

/// A text-generation provider. Implementations make exactly one request per
/// call and never retry on their own.
#[async_trait]
pub trait TextGenerationProvider: Send + Sync + Debug {
    async fn generate(
        &self,
        request: &GenerateContentRequest,
        credential: &Credential,
        attempt: CallAttempt,
    ) -> Result<ProviderResponse, DomainError>;

    fn provider_name(&self) -> &'static str;
}
