//! User profile model
//!
//! One row per authenticated identity, keyed by the auth provider's user ID.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role assigned to every new profile
pub const DEFAULT_ROLE: &str = "user";

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

/// Stored user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Same ID as the auth provider's user
    pub id: String,
    /// Email address at creation time
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Global role (defaults to "user")
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Non-blank full name, if set
    pub fn display_name(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Partial profile update
///
/// Only fields a user may edit themselves; `role` and `email` are not
/// reachable from here. Unset fields are left out of the patch entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ProfileUpdate {
    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_defaults_role() {
        let profile: UserProfile =
            serde_json::from_value(json!({"id": "u1", "email": "a@b.co"})).unwrap();
        assert_eq!(profile.role, DEFAULT_ROLE);
        assert!(profile.full_name.is_none());
        assert!(profile.created_at.is_none());
    }

    #[test]
    fn test_profile_parses_hosted_timestamps() {
        let profile: UserProfile = serde_json::from_value(json!({
            "id": "u1",
            "email": "a@b.co",
            "role": "admin",
            "full_name": null,
            "created_at": "2025-06-01T10:00:00.123456+00:00",
            "updated_at": "2025-06-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(profile.role, "admin");
        assert!(profile.created_at.is_some());
    }

    #[test]
    fn test_display_name_ignores_blank() {
        let mut profile: UserProfile =
            serde_json::from_value(json!({"id": "u1", "email": "a@b.co", "full_name": "  "}))
                .unwrap();
        assert_eq!(profile.display_name(), None);

        profile.full_name = Some("Jane Doe".into());
        assert_eq!(profile.display_name(), Some("Jane Doe"));
    }

    #[test]
    fn test_update_skips_unset_fields() {
        let update = ProfileUpdate {
            bio: Some("hello".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"bio": "hello"}));
        assert!(!update.is_empty());
        assert!(ProfileUpdate::default().is_empty());
    }

    #[test]
    fn test_update_rejects_role() {
        let result: Result<ProfileUpdate, _> = serde_json::from_value(json!({"role": "admin"}));
        assert!(result.is_err());
    }
}
