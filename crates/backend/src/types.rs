//! Auth subsystem types
//!
//! Shapes follow the hosted auth provider's JSON so they deserialize directly.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form metadata attached to an identity at sign-up
pub type UserMetadata = serde_json::Map<String, Value>;

/// Metadata keys that may carry a display name, in priority order
const DISPLAY_NAME_KEYS: [&str; 2] = ["full_name", "name"];

/// Identity as known to the auth subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Opaque user ID
    pub id: String,

    /// Email address (absent for phone-only identities)
    #[serde(default)]
    pub email: Option<String>,

    /// Metadata supplied at sign-up
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl AuthUser {
    /// Create a user with an email and no metadata
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: Some(email.into()),
            user_metadata: UserMetadata::new(),
        }
    }

    /// Display name from provider metadata, if a non-empty one was supplied
    pub fn display_name(&self) -> Option<&str> {
        DISPLAY_NAME_KEYS.iter().find_map(|key| {
            self.user_metadata
                .get(*key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty())
        })
    }
}

/// An authenticated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token for backend calls on behalf of the user
    pub access_token: String,

    /// Token used to rotate the access token
    pub refresh_token: String,

    /// Token type (always "bearer" in practice)
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Expiry as a Unix timestamp (seconds)
    #[serde(default)]
    pub expires_at: Option<i64>,

    /// The signed-in identity
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl AuthSession {
    /// Whether the access token has passed its expiry
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now().timestamp())
    }
}

/// Result of a sign-up request
///
/// When the backend requires email confirmation, `session` is `None` until
/// the user follows the link in their inbox.
#[derive(Debug, Clone, Default)]
pub struct SignUp {
    /// Newly created identity
    pub user: Option<AuthUser>,
    /// Session, only when sign-up also signed the user in
    pub session: Option<AuthSession>,
}

/// What changed in an auth client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChange {
    /// User signed in
    SignedIn,
    /// User signed out or the session could not be refreshed
    SignedOut,
    /// Access token rotated
    TokenRefreshed,
}

/// Auth-state change notification
#[derive(Debug, Clone)]
pub struct AuthEvent {
    /// Kind of change
    pub change: AuthChange,
    /// Session after the change (`None` when signed out)
    pub session: Option<AuthSession>,
}
