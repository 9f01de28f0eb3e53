//! User activity model
//!
//! Append-only audit log. Each entry is stored as an `activity_type` column
//! plus a JSON `activity_data` payload; [`Activity`] is the typed view of
//! that pair.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};

use super::ProfileUpdate;
use crate::error::{ControlError, Result};

/// Activity type column value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Login,
    Logout,
    Signup,
    ProfileUpdate,
    ContactForm,
    NewsletterSignup,
    PageView,
}

impl ActivityKind {
    /// All kinds, in column-value order
    pub const ALL: [ActivityKind; 7] = [
        Self::Login,
        Self::Logout,
        Self::Signup,
        Self::ProfileUpdate,
        Self::ContactForm,
        Self::NewsletterSignup,
        Self::PageView,
    ];

    /// Convert to the stored column value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Signup => "signup",
            Self::ProfileUpdate => "profile_update",
            Self::ContactForm => "contact_form",
            Self::NewsletterSignup => "newsletter_signup",
            Self::PageView => "page_view",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ControlError::invalid("activity_type", format!("unknown value '{s}'")))
    }
}

/// A recorded user action and the data relevant to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    Login,
    Logout,
    /// Account registered under this display name
    Signup { name: String },
    /// Profile fields that were changed
    ProfileUpdate(ProfileUpdate),
    /// Contact form sent with this subject
    ContactForm { subject: String },
    /// Newsletter subscription for this address
    NewsletterSignup { email: String },
    /// Page visited
    PageView { path: String },
}

impl Activity {
    /// The `activity_type` column value
    pub fn kind(&self) -> ActivityKind {
        match self {
            Self::Login => ActivityKind::Login,
            Self::Logout => ActivityKind::Logout,
            Self::Signup { .. } => ActivityKind::Signup,
            Self::ProfileUpdate(_) => ActivityKind::ProfileUpdate,
            Self::ContactForm { .. } => ActivityKind::ContactForm,
            Self::NewsletterSignup { .. } => ActivityKind::NewsletterSignup,
            Self::PageView { .. } => ActivityKind::PageView,
        }
    }

    /// The `activity_data` payload; `None` for kinds that carry nothing
    pub fn data(&self) -> Option<Value> {
        match self {
            Self::Login | Self::Logout => None,
            Self::Signup { name } => Some(json!({ "name": name })),
            Self::ProfileUpdate(update) => serde_json::to_value(update).ok(),
            Self::ContactForm { subject } => Some(json!({ "subject": subject })),
            Self::NewsletterSignup { email } => Some(json!({ "email": email })),
            Self::PageView { path } => Some(json!({ "path": path })),
        }
    }

    /// Rebuild from stored columns
    pub fn from_parts(kind: ActivityKind, data: Value) -> Result<Self> {
        let data = match data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        Ok(match kind {
            ActivityKind::Login => Self::Login,
            ActivityKind::Logout => Self::Logout,
            ActivityKind::Signup => Self::Signup {
                name: string_field(&data, "name")?,
            },
            ActivityKind::ProfileUpdate => Self::ProfileUpdate(
                serde_json::from_value(data)
                    .map_err(|e| ControlError::malformed("activity", e))?,
            ),
            ActivityKind::ContactForm => Self::ContactForm {
                subject: string_field(&data, "subject")?,
            },
            ActivityKind::NewsletterSignup => Self::NewsletterSignup {
                email: string_field(&data, "email")?,
            },
            ActivityKind::PageView => Self::PageView {
                path: string_field(&data, "path")?,
            },
        })
    }
}

fn string_field(data: &Value, field: &'static str) -> Result<String> {
    data.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ControlError::invalid(field, "missing from activity_data"))
}

/// Serializes as the `activity_type` / `activity_data` column pair
impl Serialize for Activity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("activity_type", &self.kind())?;
        map.serialize_entry("activity_data", &self.data())?;
        map.end()
    }
}

/// Stored activity log entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserActivity {
    pub id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub activity: Activity,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Raw activity row as the store returns it
#[derive(Debug, Deserialize)]
struct ActivityRow {
    id: String,
    user_id: String,
    activity_type: String,
    #[serde(default)]
    activity_data: Value,
    #[serde(default)]
    ip_address: Option<String>,
    #[serde(default)]
    user_agent: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl UserActivity {
    /// Decode a stored row
    pub fn from_row(row: Value) -> Result<Self> {
        let row: ActivityRow =
            serde_json::from_value(row).map_err(|e| ControlError::malformed("activity", e))?;
        let kind: ActivityKind = row.activity_type.parse()?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            activity: Activity::from_parts(kind, row.activity_data)?,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        for kind in ActivityKind::ALL {
            assert_eq!(kind.as_str().parse::<ActivityKind>().unwrap(), kind);
        }
        assert!("wave".parse::<ActivityKind>().is_err());
    }

    #[test]
    fn test_kind_serde_matches_as_str() {
        let value = serde_json::to_value(ActivityKind::NewsletterSignup).unwrap();
        assert_eq!(value, json!("newsletter_signup"));
    }

    #[test]
    fn test_data_payloads() {
        assert_eq!(Activity::Login.data(), None);
        assert_eq!(
            Activity::ContactForm { subject: "Hi there".into() }.data(),
            Some(json!({"subject": "Hi there"}))
        );
        assert_eq!(
            Activity::ProfileUpdate(ProfileUpdate {
                bio: Some("x".into()),
                ..Default::default()
            })
            .data(),
            Some(json!({"bio": "x"}))
        );
    }

    #[test]
    fn test_from_parts_null_data() {
        assert_eq!(
            Activity::from_parts(ActivityKind::Logout, Value::Null).unwrap(),
            Activity::Logout
        );
        assert_eq!(
            Activity::from_parts(ActivityKind::ProfileUpdate, Value::Null).unwrap(),
            Activity::ProfileUpdate(ProfileUpdate::default())
        );
    }

    #[test]
    fn test_from_parts_missing_field() {
        let err = Activity::from_parts(ActivityKind::Signup, json!({})).unwrap_err();
        assert!(matches!(err, ControlError::Invalid { field: "name", .. }));
    }

    #[test]
    fn test_user_activity_from_row() {
        let activity = UserActivity::from_row(json!({
            "id": "a1",
            "user_id": "u1",
            "activity_type": "newsletter_signup",
            "activity_data": {"email": "a@b.co"},
            "ip_address": "203.0.113.7",
            "user_agent": null,
            "created_at": "2025-06-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(
            activity.activity,
            Activity::NewsletterSignup { email: "a@b.co".into() }
        );
        assert_eq!(activity.ip_address.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_user_activity_serializes_flat() {
        let activity = UserActivity {
            id: "a1".into(),
            user_id: "u1".into(),
            activity: Activity::PageView { path: "/".into() },
            ip_address: None,
            user_agent: None,
            created_at: None,
        };

        let value = serde_json::to_value(&activity).unwrap();
        assert_eq!(value["activity_type"], "page_view");
        assert_eq!(value["activity_data"], json!({"path": "/"}));
        assert_eq!(value["user_id"], "u1");
    }
}
