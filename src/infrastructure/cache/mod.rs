//! Cache infrastructure - backing stores and the sweep task

mod factory;
mod in_memory;
mod redis;
mod sweeper;

pub use factory::{StoreConfig, StoreFactory, StoreType};
pub use in_memory::{InMemoryStore, InMemoryStoreConfig};
pub use redis::{RedisStore, RedisStoreConfig};
pub use sweeper::{spawn_sweeper, SweeperHandle, DEFAULT_SWEEP_INTERVAL};
