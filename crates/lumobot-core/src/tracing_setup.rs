use std::fs::OpenOptions;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable naming an optional debug log file
pub const LOG_FILE_ENV: &str = "LUMOBOT_LOG_FILE";

/// Install the global subscriber: stderr output filtered by `RUST_LOG`
/// (default `info`), plus a debug-level file layer when `LUMOBOT_LOG_FILE`
/// is set.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    let registry = tracing_subscriber::registry().with(stderr_layer);

    match std::env::var(LOG_FILE_ENV).ok().filter(|p| !p.is_empty()) {
        Some(log_path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .with_context(|| format!("Failed to open log file: {}", log_path))?;

            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);

            registry
                .with(file_layer)
                .try_init()
                .context("Failed to install tracing subscriber")?;
            tracing::debug!(path = %log_path, "File logging enabled");
        }
        None => registry
            .try_init()
            .context("Failed to install tracing subscriber")?,
    }
    Ok(())
}
