//! Tracing subscriber setup.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use gitwatch_pipeline::LogLevel;

/// Log file name inside the log directory.
pub const LOG_FILE: &str = "gitwatch.log";

/// `~/.gitwatch/logs`.
pub fn log_dir() -> Result<PathBuf> {
    Ok(gitwatch_pipeline::state_dir()?.join("logs"))
}

/// Filter from `RUST_LOG` when set, otherwise from the configured level.
pub fn filter_for(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()))
}

/// Install the global subscriber: stderr plus a plain-text file in
/// `log_dir`.
///
/// The returned guard flushes the file writer when dropped and must be held
/// for the life of the process.
pub fn init(level: LogLevel, log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter_for(level))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()
        .context("Failed to initialize tracing")?;

    Ok(guard)
}
