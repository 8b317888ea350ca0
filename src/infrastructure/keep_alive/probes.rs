//! Host liveness probes

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::cache::KeyValueStore;
use crate::domain::keep_alive::LivenessProbe;
use crate::domain::DomainError;

/// Key read by the storage heartbeat; never written
pub const HEARTBEAT_KEY: &str = "keepAlive";

/// No-op read against the persistent store
#[derive(Debug, Clone)]
pub struct StoreHeartbeat {
    store: Arc<dyn KeyValueStore>,
}

impl StoreHeartbeat {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LivenessProbe for StoreHeartbeat {
    async fn beat(&self) -> Result<(), DomainError> {
        self.store.get_raw(HEARTBEAT_KEY).await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "store"
    }
}

/// Round trip through the task scheduler
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerHeartbeat;

#[async_trait]
impl LivenessProbe for SchedulerHeartbeat {
    async fn beat(&self) -> Result<(), DomainError> {
        tokio::spawn(async {})
            .await
            .map_err(|e| DomainError::internal(format!("Scheduler heartbeat failed: {}", e)))
    }

    fn name(&self) -> &'static str {
        "scheduler"
    }
}
