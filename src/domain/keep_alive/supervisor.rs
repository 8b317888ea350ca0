use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::DomainError;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Consecutive failed heartbeats before escalating the log level
const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// A cheap no-op touch of a host primitive that signals the process is busy
#[async_trait]
pub trait LivenessProbe: Send + Sync + Debug {
    async fn beat(&self) -> Result<(), DomainError>;

    fn name(&self) -> &'static str;
}

/// Keeps the host process alive while a pipeline invocation is in flight.
/// Heartbeats never influence the invocation's outcome.
#[derive(Debug, Clone)]
pub struct KeepAliveSupervisor {
    probes: Vec<Arc<dyn LivenessProbe>>,
    interval: Duration,
}

impl Default for KeepAliveSupervisor {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_INTERVAL)
    }
}

impl KeepAliveSupervisor {
    pub fn new(interval: Duration) -> Self {
        Self {
            probes: Vec::new(),
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn LivenessProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts heartbeating every interval until the handle is stopped or dropped
    pub fn start(&self) -> KeepAliveHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let beats = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn(heartbeat_loop(
            self.probes.clone(),
            self.interval,
            shutdown_rx,
            beats.clone(),
        ));

        debug!(interval_ms = self.interval.as_millis() as u64, "Keep-alive started");

        KeepAliveHandle {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
            beats,
        }
    }

    /// Stops the heartbeat, returning how many beats were sent
    pub fn stop(&self, mut handle: KeepAliveHandle) -> u64 {
        handle.shutdown();
        let beats = handle.beats();
        debug!(beats, "Keep-alive stopped");
        beats
    }
}

async fn heartbeat_loop(
    probes: Vec<Arc<dyn LivenessProbe>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    beats: Arc<AtomicU64>,
) {
    let mut consecutive_failures: u32 = 0;
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let results = join_all(probes.iter().map(|probe| probe.beat())).await;
                let mut failed = false;

                for (probe, result) in probes.iter().zip(results) {
                    if let Err(e) = result {
                        failed = true;
                        warn!(probe = probe.name(), error = %e, "Heartbeat probe failed");
                    }
                }

                let beat = beats.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(beat, "Heartbeat");

                if failed {
                    consecutive_failures += 1;
                    if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                        tracing::error!(
                            consecutive_failures,
                            "Heartbeat failing repeatedly, host may suspend the process"
                        );
                    }
                } else {
                    consecutive_failures = 0;
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

/// Running heartbeat; aborts the task when dropped
#[derive(Debug)]
pub struct KeepAliveHandle {
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
    beats: Arc<AtomicU64>,
}

impl KeepAliveHandle {
    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for KeepAliveHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
