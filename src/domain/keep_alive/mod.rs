//! Keep-alive supervision for long-running invocations

mod supervisor;

pub use supervisor::{
    KeepAliveHandle, KeepAliveSupervisor, LivenessProbe, DEFAULT_HEARTBEAT_INTERVAL,
};

#[cfg(test)]
pub use supervisor::mock::MockLivenessProbe;
