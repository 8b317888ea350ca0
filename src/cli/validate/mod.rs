//! Validate command - checks configuration and credential shape without calling the provider

use clap::Args;

use super::{bootstrap, CREDENTIAL_ENV};
use crate::config::AppConfig;
use crate::domain::{DomainError, RequestConfig, RequestValidator};

/// Arguments for the validate command
#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Provider API key to check
    #[arg(long, env = CREDENTIAL_ENV, hide_env_values = true)]
    pub credential: Option<String>,
}

/// Run the checks and print a one-line verdict
pub async fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let config = bootstrap()?;

    check(&config, args.credential.as_deref())?;

    println!("Configuration OK");
    Ok(())
}

fn check(config: &AppConfig, credential: Option<&str>) -> Result<(), DomainError> {
    config.cache.to_store_config()?;

    if config.retry.max_attempts == 0 {
        return Err(DomainError::configuration("retry.max_attempts must be at least 1"));
    }

    if config.provider.base_timeout_ms == 0 {
        return Err(DomainError::configuration("provider.base_timeout_ms must be positive"));
    }

    RequestValidator::new(config.provider.credential_prefix.clone())
        .validate(&RequestConfig::new(credential.unwrap_or_default()))?;

    Ok(())
}
