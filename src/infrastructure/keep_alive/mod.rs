//! Liveness probes against host primitives

mod probes;

pub use probes::{SchedulerHeartbeat, StoreHeartbeat, HEARTBEAT_KEY};
