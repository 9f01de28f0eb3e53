//! Mailing list error types

use thiserror::Error;

/// Errors from the email list provider
#[derive(Debug, Error)]
pub enum MailingError {
    /// Request could not be sent or timed out
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("provider error: HTTP {status}: {body}")]
    Server { status: u16, body: String },
}

/// Result type for mailing list operations
pub type Result<T> = std::result::Result<T, MailingError>;
