//! Session user
//!
//! The UI-facing view of an authenticated identity, rebuilt on every
//! session event from the auth user plus their stored profile.

use folio_backend::AuthUser;
use folio_control::{DEFAULT_ROLE, UserProfile};
use serde::Serialize;

/// Authenticated user of a browser session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    /// First non-empty of profile name, provider metadata name, email local-part
    pub name: String,
    /// Profile role, "user" without a profile
    pub role: String,
    /// Stored profile; absent when lookup and creation both failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}

impl SessionUser {
    /// Build from an auth identity and its profile
    pub fn new(auth_user: &AuthUser, email: &str, profile: Option<UserProfile>) -> Self {
        let name = profile
            .as_ref()
            .and_then(UserProfile::display_name)
            .or_else(|| auth_user.display_name())
            .map(str::to_string)
            .unwrap_or_else(|| email_local_part(email).to_string());

        let role = profile
            .as_ref()
            .map(|p| p.role.clone())
            .filter(|role| !role.is_empty())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());

        Self {
            id: auth_user.id.clone(),
            email: email.to_string(),
            name,
            role,
            profile,
        }
    }

    /// Replace the profile after an edit
    ///
    /// The name follows the profile only when it sets one.
    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        if let Some(name) = profile.display_name() {
            self.name = name.to_string();
        }
        if !profile.role.is_empty() {
            self.role = profile.role.clone();
        }
        self.profile = Some(profile);
        self
    }
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}
