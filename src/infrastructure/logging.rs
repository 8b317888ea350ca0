use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, LoggingConfig};

const FALLBACK_LEVEL: &str = "info";

/// Diagnostics for every pipeline command go to stderr so the reply JSON on
/// stdout stays machine-readable. `RUST_LOG` overrides `logging.level`.
pub fn init_logging(config: &LoggingConfig) {
    let (filter, rejected) = reply_filter(config);

    let output = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let installed = tracing_subscriber::registry()
        .with(output.with_filter(filter))
        .try_init()
        .is_ok();

    if let Some(level) = rejected {
        tracing::warn!(level = %level, fallback = FALLBACK_LEVEL, "Unusable log level in config");
    }
    tracing::debug!(installed, format = ?config.format, "Reply pipeline diagnostics on stderr");
}

/// Filter from `RUST_LOG`, then the configured level. A level that does not
/// parse is handed back so it can be reported once logging is up.
fn reply_filter(config: &LoggingConfig) -> (EnvFilter, Option<String>) {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return (filter, None);
    }

    match EnvFilter::try_new(&config.level) {
        Ok(filter) => (filter, None),
        Err(_) => (EnvFilter::new(FALLBACK_LEVEL), Some(config.level.clone())),
    }
}
