//! CLI module for the reply pipeline
//!
//! Subcommands:
//! - `generate`: run the pipeline over a transcript and print the result
//! - `sweep`: remove stale cache entries (or everything with `--clear`)
//! - `validate`: check configuration and credential shape

pub mod generate;
pub mod sweep;
pub mod validate;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Environment variable read when `--credential` is omitted
pub const CREDENTIAL_ENV: &str = "REPLY_PIPELINE_CREDENTIAL";

/// Reply Pipeline - resilient assistant replies for conversation threads
#[derive(Parser)]
#[command(name = "reply-pipeline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a reply for a transcript
    Generate(generate::GenerateArgs),

    /// Sweep stale cache entries
    Sweep(sweep::SweepArgs),

    /// Validate configuration and credential
    Validate(validate::ValidateArgs),
}

/// Loads `.env`, the layered configuration and the log subscriber
pub(crate) fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    Ok(config)
}
