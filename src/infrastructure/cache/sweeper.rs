//! Periodic cache sweep

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::cache::CacheStore;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Running sweep task; aborted when dropped
#[derive(Debug)]
pub struct SweeperHandle {
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Sweeps once right away, then every `interval`
pub fn spawn_sweeper(store: CacheStore, interval: Duration) -> SweeperHandle {
    let interval = interval.max(Duration::from_secs(1));

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let removed = store.sweep().await;
            debug!(removed, "Scheduled cache sweep");
        }
    });

    info!(interval_secs = interval.as_secs(), "Cache sweeper started");
    SweeperHandle { task }
}
