//! File logging. The TUI owns the terminal, so nothing is written to stderr.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "snailtrack.log";

/// Starts the global subscriber writing to `<log_dir>/snailtrack.log`.
///
/// `RUST_LOG` wins over `level`. Keep the returned guard alive for the life
/// of the process or buffered lines are lost.
pub fn init(level: &str, log_dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir).with_context(|| format!("creating {:?}", log_dir))?;
    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level `{level}`"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("installing log subscriber: {err}"))?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "snailtrack started");
    Ok(guard)
}
