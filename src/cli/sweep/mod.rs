//! Sweep command - one-off cache maintenance

use clap::Args;
use serde::Serialize;
use tracing::info;

use super::bootstrap;
use crate::domain::{CacheStats, CacheStore, DomainError};
use crate::infrastructure::cache::spawn_sweeper;

/// Arguments for the sweep command
#[derive(Args, Clone, Debug, Default)]
pub struct SweepArgs {
    /// Remove every cached reply instead of only stale ones
    #[arg(long)]
    pub clear: bool,

    /// Keep sweeping every `cache.sweep_interval_secs` until interrupted
    #[arg(long, conflicts_with = "clear")]
    pub watch: bool,
}

#[derive(Debug, Serialize)]
struct SweepReport {
    removed: usize,
    remaining: CacheStats,
}

/// Sweep (or clear) the configured cache and print the removed count
pub async fn run(args: SweepArgs) -> anyhow::Result<()> {
    let config = bootstrap()?;
    let cache = crate::create_cache_store(&config).await?;

    if args.watch {
        let sweeper = spawn_sweeper(cache, config.cache.sweep_interval());
        tokio::signal::ctrl_c().await?;
        info!(running = sweeper.is_running(), "Stopping cache sweeper");
        return Ok(());
    }

    let report = sweep(&cache, &args).await?;
    info!(removed = report.removed, clear = args.clear, "Cache maintenance finished");

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn sweep(cache: &CacheStore, args: &SweepArgs) -> Result<SweepReport, DomainError> {
    let removed = if args.clear {
        cache.clear().await?
    } else {
        cache.sweep().await
    };

    Ok(SweepReport {
        removed,
        remaining: cache.stats().await?,
    })
}
