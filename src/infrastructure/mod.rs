//! Infrastructure layer - Adapters for transports, stores and the host runtime

pub mod cache;
pub mod keep_alive;
pub mod llm;
pub mod logging;
