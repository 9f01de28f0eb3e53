//! Session manager error types

use thiserror::Error;

/// Session manager errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity has no email to build a profile from
    #[error("user {user_id} has no email address")]
    MissingEmail { user_id: String },

    /// The manager task is no longer running
    #[error("session manager stopped")]
    Stopped,
}

impl AuthError {
    /// Create a missing email error
    pub fn missing_email(user_id: impl Into<String>) -> Self {
        Self::MissingEmail {
            user_id: user_id.into(),
        }
    }
}

/// Result type for session manager operations
pub type Result<T> = std::result::Result<T, AuthError>;
