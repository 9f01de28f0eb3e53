//! User service error types

use folio_backend::BackendError;
use thiserror::Error;

/// User service errors
///
/// Public [`UserService`](crate::UserService) operations log these and
/// return a falsy result; only the strict lookups hand them to the caller.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Backend call failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Row did not have the expected shape
    #[error("malformed {entity} row: {source}")]
    Malformed {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid data
    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ControlError {
    /// Create a malformed row error
    pub fn malformed(entity: &'static str, source: serde_json::Error) -> Self {
        Self::Malformed { entity, source }
    }

    /// Create an invalid data error
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Result type for user service operations
pub type Result<T> = std::result::Result<T, ControlError>;
