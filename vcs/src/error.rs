//! Error types for version control operations.

use thiserror::Error;

/// Result type alias for version control operations.
pub type Result<T> = std::result::Result<T, VcsError>;

/// Errors that can occur while talking to git.
///
/// These are execution errors. "No changes" is never an error; it is an empty
/// status.
#[derive(Error, Debug)]
pub enum VcsError {
    /// The git binary could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A git invocation exceeded its time budget and was killed.
    #[error("`{command}` timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    /// A git invocation exited unsuccessfully.
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The directory is not a git working tree.
    #[error("not a git repository: {0}")]
    NotARepository(String),

    /// Commit found nothing staged.
    #[error("nothing to commit")]
    NothingToCommit,
}

/// Errors from the commit step of a publish.
///
/// Push failures are not errors; they are recorded on the commit record.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The change set had nothing to publish.
    #[error("nothing to commit")]
    NothingToCommit,

    /// Staging or committing failed.
    #[error("commit failed: {0}")]
    Commit(#[source] VcsError),
}

impl From<VcsError> for PublishError {
    fn from(err: VcsError) -> Self {
        match err {
            VcsError::NothingToCommit => Self::NothingToCommit,
            other => Self::Commit(other),
        }
    }
}
