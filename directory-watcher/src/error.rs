//! Error types for the directory watcher.

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur in the directory watcher.
///
/// Every variant is fatal to the pipeline: a lost watch target cannot be
/// recovered from inside the process.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Watch root does not exist.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// Watch root exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Watch root disappeared while being watched.
    #[error("watched directory was removed: {0}")]
    RootRemoved(String),

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
