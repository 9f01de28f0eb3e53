//! Session state
//!
//! ```text
//! Initializing ──┬──► Unauthenticated ◄──┐
//!                └──► Authenticated ◄────┘
//! ```
//!
//! `Authenticated` is re-entered on every session event (sign-in, token
//! refresh), rebuilding the user each time.

use serde::Serialize;

use crate::user::SessionUser;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Initial session lookup not finished
    Initializing,
    Unauthenticated,
    Authenticated,
}

/// Snapshot published to readers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub status: SessionStatus,
    /// Present only when authenticated
    pub user: Option<SessionUser>,
    /// True while initializing or while a login/signup call is running
    pub is_loading: bool,
}

impl SessionState {
    pub(crate) fn initializing() -> Self {
        Self {
            status: SessionStatus::Initializing,
            user: None,
            is_loading: true,
        }
    }

    /// Whether a user is signed in
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Whether the initial lookup has finished
    pub fn is_ready(&self) -> bool {
        self.status != SessionStatus::Initializing
    }
}

/// Result of a login or signup call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub message: String,
}

impl AuthOutcome {
    /// Successful outcome
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Failed outcome
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
