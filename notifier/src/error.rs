//! Error types for chat delivery.

use thiserror::Error;

/// Result type alias for notifier operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Errors that can occur while delivering a message.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Transport not configured.
    #[error("chat transport not configured: {0}")]
    NotConfigured(String),

    /// The chat API rejected the message.
    #[error("API request failed ({status}): {body}")]
    ApiRequest { status: u16, body: String },

    /// The send did not complete in time.
    #[error("send timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The message exceeds what the transport accepts.
    #[error("message too long: {length} UTF-16 units, max {max_length}")]
    MessageTooLong { length: usize, max_length: usize },

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
