//! User service
//!
//! Typed operations over the row store. Every public operation is
//! independently fallible and reports failure as `None`, `false` or an empty
//! list after logging the cause; nothing is propagated to the caller except
//! through [`UserService::fetch_user_profile`].

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use folio_backend::{Filter, Query, Row, RowStore};
use serde_json::{Map, Value, json};
use tracing::{debug, error, warn};

use crate::context::RequestContext;
use crate::error::{ControlError, Result};
use crate::models::{
    Activity, ContactSubmission, DEFAULT_ROLE, NewsletterStatus, NewsletterSubscription,
    ProfileUpdate, UserActivity, UserProfile,
};

/// Profile table
pub const PROFILES_TABLE: &str = "user_profiles";
/// Activity log table
pub const ACTIVITIES_TABLE: &str = "user_activities";
/// Contact form table
pub const CONTACT_TABLE: &str = "contact_submissions";
/// Newsletter table
pub const NEWSLETTER_TABLE: &str = "newsletter_subscriptions";

/// Default page size for [`UserService::get_user_activities`]
pub const DEFAULT_ACTIVITY_LIMIT: usize = 50;

/// Stateless facade over the row store
#[derive(Clone)]
pub struct UserService {
    rows: Arc<dyn RowStore>,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService")
            .field("rows", &self.rows.name())
            .finish()
    }
}

impl UserService {
    /// Create a service over the given row store
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self { rows }
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Insert a profile with the default role
    pub async fn create_user_profile(
        &self,
        user_id: &str,
        email: &str,
        full_name: Option<&str>,
    ) -> Option<UserProfile> {
        let mut row = json!({
            "id": user_id,
            "email": email,
            "role": DEFAULT_ROLE,
        });
        if let Some(name) = full_name {
            row["full_name"] = json!(name);
        }

        let result = match self.rows.insert(PROFILES_TABLE, row).await {
            Ok(row) => decode_profile(row),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(profile) => {
                debug!(user_id, "User profile created");
                Some(profile)
            }
            Err(e) => {
                error!(user_id, error = %e, "Error creating user profile");
                None
            }
        }
    }

    /// Look up a profile, distinguishing "absent" from "lookup failed"
    pub async fn fetch_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let row = self
            .rows
            .select_one(PROFILES_TABLE, Query::new().eq("id", user_id))
            .await?;

        row.map(decode_profile).transpose()
    }

    /// Look up a profile; `None` when absent or on error
    pub async fn get_user_profile(&self, user_id: &str) -> Option<UserProfile> {
        match self.fetch_user_profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                error!(user_id, error = %e, "Error fetching user profile");
                None
            }
        }
    }

    /// Apply a partial update, stamping `updated_at`
    pub async fn update_user_profile(
        &self,
        user_id: &str,
        updates: &ProfileUpdate,
    ) -> Option<UserProfile> {
        match self.try_update_profile(user_id, updates).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                warn!(user_id, "Profile update matched no rows");
                None
            }
            Err(e) => {
                error!(user_id, error = %e, "Error updating user profile");
                None
            }
        }
    }

    async fn try_update_profile(
        &self,
        user_id: &str,
        updates: &ProfileUpdate,
    ) -> Result<Option<UserProfile>> {
        let mut patch = match serde_json::to_value(updates) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => Map::new(),
            Err(e) => return Err(ControlError::malformed("profile update", e)),
        };
        patch.insert("updated_at".to_string(), json!(timestamp()));

        let rows = self
            .rows
            .update(PROFILES_TABLE, &Filter::new().eq("id", user_id), Value::Object(patch))
            .await?;

        rows.into_iter().next().map(decode_profile).transpose()
    }

    // =========================================================================
    // Activity log
    // =========================================================================

    /// Append an activity entry; failures are logged only
    pub async fn track_activity(
        &self,
        user_id: &str,
        activity: &Activity,
        context: Option<&RequestContext>,
    ) {
        let mut row = Map::new();
        row.insert("user_id".into(), json!(user_id));
        row.insert("activity_type".into(), json!(activity.kind()));
        if let Some(data) = activity.data() {
            row.insert("activity_data".into(), data);
        }
        insert_context(&mut row, context, true);

        match self.rows.insert(ACTIVITIES_TABLE, Value::Object(row)).await {
            Ok(_) => debug!(user_id, activity = %activity.kind(), "Activity tracked"),
            Err(e) => warn!(
                user_id,
                activity = %activity.kind(),
                error = %e,
                "Error tracking activity"
            ),
        }
    }

    /// Most recent activity first, at most `limit` entries
    pub async fn get_user_activities(&self, user_id: &str, limit: usize) -> Vec<UserActivity> {
        let query = Query::new()
            .eq("user_id", user_id)
            .order_by("created_at", false)
            .limit(limit);

        let rows = match self.rows.select(ACTIVITIES_TABLE, &query).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(user_id, error = %e, "Error fetching user activities");
                return Vec::new();
            }
        };

        rows.into_iter()
            .filter_map(|row| match UserActivity::from_row(row) {
                Ok(activity) => Some(activity),
                Err(e) => {
                    warn!(user_id, error = %e, "Skipping unreadable activity row");
                    None
                }
            })
            .collect()
    }

    // =========================================================================
    // Lead capture
    // =========================================================================

    /// Store a contact form submission
    ///
    /// A signed-in sender also gets a `contact_form` activity entry.
    pub async fn submit_contact_form(
        &self,
        submission: &ContactSubmission,
        user_id: Option<&str>,
        context: Option<&RequestContext>,
    ) -> bool {
        let mut row = match serde_json::to_value(submission) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) | Err(_) => {
                error!("Contact submission did not serialize to an object");
                return false;
            }
        };
        if let Some(user_id) = user_id {
            row.insert("user_id".into(), json!(user_id));
        }
        insert_context(&mut row, context, false);

        if let Err(e) = self.rows.insert(CONTACT_TABLE, Value::Object(row)).await {
            error!(error = %e, "Error submitting contact form");
            return false;
        }

        if let Some(user_id) = user_id {
            let activity = Activity::ContactForm {
                subject: submission.subject.clone(),
            };
            self.track_activity(user_id, &activity, context).await;
        }

        true
    }

    /// Subscribe an address, updating any existing subscription for it
    pub async fn subscribe_to_newsletter(
        &self,
        email: &str,
        user_id: Option<&str>,
        context: Option<&RequestContext>,
    ) -> bool {
        let subscription = NewsletterSubscription {
            email: email.to_string(),
            user_id: user_id.map(str::to_string),
            status: NewsletterStatus::Active,
        };

        let mut row = match serde_json::to_value(&subscription) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) | Err(_) => {
                error!("Newsletter subscription did not serialize to an object");
                return false;
            }
        };
        row.insert("updated_at".into(), json!(timestamp()));

        if let Err(e) = self
            .rows
            .upsert(NEWSLETTER_TABLE, Value::Object(row), "email")
            .await
        {
            error!(error = %e, "Error subscribing to newsletter");
            return false;
        }

        if let Some(user_id) = user_id {
            let activity = Activity::NewsletterSignup {
                email: email.to_string(),
            };
            self.track_activity(user_id, &activity, context).await;
        }

        true
    }
}

fn decode_profile(row: Row) -> Result<UserProfile> {
    serde_json::from_value(row).map_err(|e| ControlError::malformed("profile", e))
}

fn insert_context(row: &mut Map<String, Value>, context: Option<&RequestContext>, user_agent: bool) {
    let Some(context) = context else {
        return;
    };
    if let Some(ip) = &context.ip_address {
        row.insert("ip_address".into(), json!(ip));
    }
    if user_agent && let Some(ua) = &context.user_agent {
        row.insert("user_agent".into(), json!(ua));
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
