//! Backend error types

use thiserror::Error;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors reported by the hosted backend or the transport in front of it
#[derive(Debug, Error)]
pub enum BackendError {
    /// The auth subsystem rejected the request
    ///
    /// `message` is the provider's own wording and is safe to show to the user.
    #[error("{message}")]
    Auth {
        /// HTTP status, when the provider is remote
        status: Option<u16>,
        /// Provider message, verbatim
        message: String,
    },

    /// The auth subsystem failed on its side (5xx or an unexpected status)
    #[error("auth service unavailable ({status}): {message}")]
    Unavailable {
        /// HTTP status returned
        status: u16,
        /// Body message or status reason
        message: String,
    },

    /// The row store rejected a read or write
    #[error("row store error on '{table}': {message}")]
    Store {
        /// Table the operation targeted
        table: String,
        /// Store message
        message: String,
    },

    /// Network or protocol failure talking to the backend
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with something we could not decode
    #[error("invalid backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Create an auth error
    pub fn auth(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Auth {
            status,
            message: message.into(),
        }
    }

    /// Create an auth-service failure
    pub fn unavailable(status: u16, message: impl Into<String>) -> Self {
        Self::Unavailable {
            status,
            message: message.into(),
        }
    }

    /// Create a row store error
    pub fn store(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Provider message for auth rejections, `None` for every other failure
    pub fn auth_message(&self) -> Option<&str> {
        match self {
            Self::Auth { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_displays_provider_message() {
        let err = BackendError::auth(Some(400), "Invalid login credentials");
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert_eq!(err.auth_message(), Some("Invalid login credentials"));
    }

    #[test]
    fn test_unavailable_has_no_provider_message() {
        let err = BackendError::unavailable(502, "Bad Gateway");
        assert!(err.auth_message().is_none());
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_store_error() {
        let err = BackendError::store("contact_submissions", "permission denied");
        assert!(err.to_string().contains("contact_submissions"));
        assert!(err.to_string().contains("permission denied"));
        assert!(err.auth_message().is_none());
    }
}
