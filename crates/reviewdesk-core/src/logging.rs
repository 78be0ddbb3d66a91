//! Tracing setup for front ends linking this crate.

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log file prefix; the appender adds the date.
const LOG_FILE_PREFIX: &str = "reviewdesk.log";

fn env_filter() -> EnvFilter {
    // RUST_LOG controls the level (e.g. RUST_LOG=reviewdesk_core=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Initialize the tracing subscriber, logging to stderr.
pub fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .try_init()
        .context("Failed to install tracing subscriber")
}

/// Log to a daily rolling file in `dir` instead of stderr. Keep the returned
/// guard alive for as long as logs should be flushed.
pub fn init_file_tracing(dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log dir {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter())
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(guard)
}
