//! Reply Pipeline
//!
//! Generates an assistant reply for a conversation transcript with:
//! - Request validation and a Gemini-style transport with escalating timeouts
//! - One bounded retry budget with exponential backoff
//! - A namespaced TTL cache over moka or redis
//! - A failure taxonomy with localized messages and recovery actions
//! - Heartbeats that keep the host alive during long calls

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use domain::llm::CredentialRedactor;
use domain::{CacheStore, KeepAliveSupervisor, KeyValueStore, Pipeline};
use infrastructure::{
    cache::StoreFactory,
    keep_alive::{SchedulerHeartbeat, StoreHeartbeat},
    llm::{GeminiProvider, HttpClient},
};
use tracing::info;

/// Create the pipeline with the default configuration
pub async fn create_pipeline() -> anyhow::Result<Pipeline> {
    create_pipeline_with_config(&AppConfig::default()).await
}

/// Wire the pipeline from configuration: transport, cache, keep-alive and retry policy
pub async fn create_pipeline_with_config(config: &AppConfig) -> anyhow::Result<Pipeline> {
    let backend = create_backend(config).await?;
    Ok(assemble_pipeline(config, backend).await)
}

/// Expired replies left by earlier runs are swept before the pipeline is handed out
async fn assemble_pipeline(config: &AppConfig, backend: Arc<dyn KeyValueStore>) -> Pipeline {
    let cache = open_cache(config, backend.clone()).await;

    let http = HttpClient::new()
        .with_redactor(CredentialRedactor::new(&config.provider.credential_prefix));
    let provider = GeminiProvider::new(http)
        .with_base_url(config.provider.base_url.clone())
        .with_model(config.provider.model.clone())
        .with_base_timeout(config.provider.base_timeout());

    let keep_alive = KeepAliveSupervisor::new(config.keep_alive.interval())
        .with_probe(Arc::new(StoreHeartbeat::new(backend)))
        .with_probe(Arc::new(SchedulerHeartbeat));

    info!(
        model = %config.provider.model,
        cache = %config.cache.backend,
        locale = ?config.locale,
        "Pipeline configured"
    );

    Pipeline::new(Arc::new(provider))
        .with_cache(cache)
        .with_credential_prefix(config.provider.credential_prefix.clone())
        .with_locale(config.locale)
        .with_keep_alive(keep_alive)
        .with_retry_policy(config.retry.to_policy())
}

/// Create the cache service alone, for maintenance commands
pub async fn create_cache_store(config: &AppConfig) -> anyhow::Result<CacheStore> {
    let backend = create_backend(config).await?;
    Ok(CacheStore::new(backend).with_default_ttl(config.cache.default_ttl()))
}

async fn open_cache(config: &AppConfig, backend: Arc<dyn KeyValueStore>) -> CacheStore {
    let cache = CacheStore::new(backend).with_default_ttl(config.cache.default_ttl());

    let removed = cache.sweep().await;
    info!(removed, "Startup cache sweep");
    cache
}

async fn create_backend(config: &AppConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let store_config = config.cache.to_store_config()?;
    let backend = StoreFactory::new().create(&store_config).await?;

    info!("Cache backend: {}", backend.backend_name());
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::cache::{CacheEntry, MockKeyValueStore};
    use domain::Locale;

    #[tokio::test]
    async fn test_create_pipeline_defaults() {
        let pipeline = create_pipeline().await.unwrap();

        assert_eq!(pipeline.provider_name(), "gemini");
        assert_eq!(pipeline.locale(), Locale::En);
        assert_eq!(pipeline.cache().unwrap().backend().backend_name(), "in_memory");
    }

    #[tokio::test]
    async fn test_create_pipeline_rejects_unknown_backend() {
        let mut config = AppConfig::default();
        config.cache.backend = "memcached".to_string();

        assert!(create_pipeline_with_config(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_pipeline_start_sweeps_expired_replies() {
        let expired = serde_json::to_string(&CacheEntry {
            value: "stale".to_string(),
            expires_at: 1,
        })
        .unwrap();
        let backend = Arc::new(
            MockKeyValueStore::new()
                .with_raw("cache_c_1", &expired)
                .with_raw("settings", &expired),
        );

        let pipeline = assemble_pipeline(&AppConfig::default(), backend.clone()).await;

        assert!(!backend.contains("cache_c_1"));
        assert!(backend.contains("settings"));
        assert_eq!(pipeline.cache().unwrap().stats().await.unwrap().entries, 0);
    }
}
