//! Error types for the pipeline.

use std::path::PathBuf;

use thiserror::Error;

use gitwatch_directory_watcher::WatcherError;
use gitwatch_vcs::VcsError;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that stop the pipeline.
///
/// Failures inside a single run never surface here; they are logged and
/// reported as a [`RunOutcome`](crate::RunOutcome).
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The change source failed. There is no recovery from losing the watch.
    #[error("watch failed: {0}")]
    WatchFatal(#[from] WatcherError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Repository error during startup checks.
    #[error("repository error: {0}")]
    Vcs(#[from] VcsError),
}

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read or written.
    #[error("config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`Config`](crate::Config).
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required setting is absent.
    #[error("missing setting: {0}")]
    Missing(&'static str),

    /// A numeric setting is zero.
    #[error("setting {0} must be greater than zero")]
    Zero(&'static str),

    /// Unknown log level name.
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    /// The watched directory is unusable.
    #[error("watched directory {path}: {reason}")]
    WatchedDir { path: PathBuf, reason: &'static str },

    /// No home directory to resolve defaults against.
    #[error("could not determine the home directory")]
    NoHomeDir,
}
