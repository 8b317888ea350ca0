mod app_config;

pub use app_config::{
    AppConfig, CacheConfig, KeepAliveConfig, LogFormat, LoggingConfig, ProviderConfig,
    RetryConfig,
};
