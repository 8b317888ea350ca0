use std::time::Duration;

use serde::Deserialize;

use crate::domain::cache::DEFAULT_TTL;
use crate::domain::llm::DEFAULT_CREDENTIAL_PREFIX;
use crate::domain::{DomainError, Locale, RetryPolicy};
use crate::infrastructure::cache::{StoreConfig, StoreType};
use crate::infrastructure::llm::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};

/// Application configuration
///
/// The provider credential is deliberately absent: it is supplied per run.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub provider: ProviderConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub keep_alive: KeepAliveConfig,
    pub locale: Locale,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    /// First-attempt transport timeout; attempt N waits N times this
    pub base_timeout_ms: u64,
    pub credential_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    pub jitter: bool,
    pub overall_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `in_memory` or `redis`
    pub backend: String,
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    pub default_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub max_capacity: Option<u64>,
    pub quota_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    pub interval_ms: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_timeout_ms: 60_000,
            credential_prefix: DEFAULT_CREDENTIAL_PREFIX.to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn base_timeout(&self) -> Duration {
        Duration::from_millis(self.base_timeout_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1_000,
            backoff_factor: 2.0,
            max_delay_ms: 30_000,
            jitter: true,
            overall_timeout_ms: 60_000,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy<DomainError> {
        RetryPolicy::new(self.max_attempts)
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_backoff_factor(self.backoff_factor)
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_jitter(self.jitter)
            .with_overall_timeout(Duration::from_millis(self.overall_timeout_ms))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: StoreType::InMemory.to_string(),
            redis_url: None,
            key_prefix: None,
            default_ttl_secs: DEFAULT_TTL.as_secs(),
            sweep_interval_secs: 3_600,
            max_capacity: None,
            quota_bytes: None,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn to_store_config(&self) -> Result<StoreConfig, DomainError> {
        Ok(StoreConfig {
            store_type: self.backend.parse()?,
            redis_url: self.redis_url.clone(),
            key_prefix: self.key_prefix.clone(),
            max_capacity: self.max_capacity,
            quota_bytes: self.quota_bytes,
        })
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self { interval_ms: 5_000 }
    }
}

impl KeepAliveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_json(json: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(json, config::FileFormat::Json))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.provider.credential_prefix, "AIza");
        assert_eq!(config.provider.base_timeout(), Duration::from_secs(60));
        assert_eq!(config.cache.default_ttl(), Duration::from_secs(3600));
        assert_eq!(config.keep_alive.interval(), Duration::from_secs(5));
        assert_eq!(config.locale, Locale::En);

        let policy = config.retry.to_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert_eq!(policy.overall_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = from_json(
            r#"{
                "locale": "es",
                "retry": { "max_attempts": 5 },
                "cache": { "backend": "redis", "redis_url": "redis://cache:6379" },
                "logging": { "format": "json" }
            }"#,
        );

        assert_eq!(config.locale, Locale::Es);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay_ms, 1_000);
        assert!(matches!(config.logging.format, LogFormat::Json));
        assert_eq!(config.logging.level, "info");

        let store = config.cache.to_store_config().unwrap();
        assert_eq!(store.store_type, StoreType::Redis);
        assert_eq!(store.redis_url.as_deref(), Some("redis://cache:6379"));
    }

    #[test]
    fn test_unknown_backend_is_configuration_error() {
        let cache = CacheConfig {
            backend: "memcached".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            cache.to_store_config(),
            Err(DomainError::Configuration { .. })
        ));
    }
}
