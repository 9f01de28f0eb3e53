//! In-process backend
//!
//! Accounts, sessions and tables held in memory. Behaves like the hosted
//! service where the site depends on it: provider error messages, email
//! confirmation, `id`/`created_at` column defaults, upsert on a natural key.
//! Used for `backend.mode = "memory"` and as the store double in tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::error::{BackendError, Result};
use crate::provider::AuthProvider;
use crate::rows::{Filter, Query, Row, RowStore, compare_values, value_equals};
use crate::types::{AuthSession, AuthUser, SignUp, UserMetadata};

/// Default access token lifetime
const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

/// Minimum password length enforced by the provider
const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    user: AuthUser,
    password: String,
    confirmed: bool,
}

#[derive(Default)]
struct AuthState {
    /// Keyed by lowercased email
    accounts: HashMap<String, Account>,
    /// Access token -> user ID
    access_tokens: HashMap<String, String>,
    /// Refresh token -> user ID
    refresh_tokens: HashMap<String, String>,
}

impl AuthState {
    fn user_by_id(&self, user_id: &str) -> Option<&AuthUser> {
        self.accounts
            .values()
            .map(|account| &account.user)
            .find(|user| user.id == user_id)
    }
}

/// In-memory auth provider and row store
pub struct MemoryBackend {
    auth: Mutex<AuthState>,
    tables: Mutex<HashMap<String, Vec<Row>>>,
    failing_tables: Mutex<HashSet<String>>,
    require_confirmation: bool,
    session_ttl_secs: i64,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("require_confirmation", &self.require_confirmation)
            .field("tables", &self.tables.lock().len())
            .finish()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty backend that requires email confirmation on sign-up
    pub fn new() -> Self {
        Self {
            auth: Mutex::new(AuthState::default()),
            tables: Mutex::new(HashMap::new()),
            failing_tables: Mutex::new(HashSet::new()),
            require_confirmation: true,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }

    /// Sign users in straight after sign-up
    pub fn auto_confirm(mut self) -> Self {
        self.require_confirmation = false;
        self
    }

    /// Set the access token lifetime (0 issues already-expired sessions)
    pub fn with_session_ttl_secs(mut self, secs: i64) -> Self {
        self.session_ttl_secs = secs;
        self
    }

    // =========================================================================
    // Seeding and inspection
    // =========================================================================

    /// Register a confirmed account
    pub fn create_user(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> AuthUser {
        let user = AuthUser {
            id: uuid::Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            user_metadata: metadata,
        };

        self.auth.lock().accounts.insert(
            email.to_lowercase(),
            Account {
                user: user.clone(),
                password: password.to_string(),
                confirmed: true,
            },
        );

        user
    }

    /// Mark an account's email as confirmed; false if no such account
    pub fn confirm_email(&self, email: &str) -> bool {
        match self.auth.lock().accounts.get_mut(&email.to_lowercase()) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Snapshot of a table's rows in insertion order
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.lock().get(table).cloned().unwrap_or_default()
    }

    /// Make every operation on `table` fail until [`heal_table`] is called
    ///
    /// [`heal_table`]: MemoryBackend::heal_table
    pub fn fail_table(&self, table: &str) {
        self.failing_tables.lock().insert(table.to_string());
    }

    /// Undo [`fail_table`](MemoryBackend::fail_table)
    pub fn heal_table(&self, table: &str) {
        self.failing_tables.lock().remove(table);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn issue_session(&self, state: &mut AuthState, user: AuthUser) -> AuthSession {
        let access_token = uuid::Uuid::new_v4().simple().to_string();
        let refresh_token = uuid::Uuid::new_v4().simple().to_string();

        state
            .access_tokens
            .insert(access_token.clone(), user.id.clone());
        state
            .refresh_tokens
            .insert(refresh_token.clone(), user.id.clone());

        AuthSession {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_at: Some(Utc::now().timestamp() + self.session_ttl_secs),
            user,
        }
    }

    fn check_table(&self, table: &str) -> Result<()> {
        if self.failing_tables.lock().contains(table) {
            return Err(BackendError::store(table, "simulated failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        let mut state = self.auth.lock();

        let user = match state.accounts.get(&email.to_lowercase()) {
            Some(account) if account.password == password => {
                if !account.confirmed {
                    return Err(BackendError::auth(Some(400), "Email not confirmed"));
                }
                account.user.clone()
            }
            _ => return Err(BackendError::auth(Some(400), "Invalid login credentials")),
        };

        Ok(self.issue_session(&mut state, user))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<SignUp> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BackendError::auth(
                Some(422),
                "Password should be at least 6 characters.",
            ));
        }

        let mut state = self.auth.lock();
        let key = email.to_lowercase();
        if state.accounts.contains_key(&key) {
            return Err(BackendError::auth(Some(422), "User already registered"));
        }

        let user = AuthUser {
            id: uuid::Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            user_metadata: metadata,
        };

        state.accounts.insert(
            key,
            Account {
                user: user.clone(),
                password: password.to_string(),
                confirmed: !self.require_confirmation,
            },
        );
        debug!(user_id = %user.id, "Account registered");

        let session = (!self.require_confirmation).then(|| self.issue_session(&mut state, user.clone()));

        Ok(SignUp {
            user: Some(user),
            session,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let mut state = self.auth.lock();
        if let Some(user_id) = state.access_tokens.remove(access_token) {
            state.refresh_tokens.retain(|_, id| *id != user_id);
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        let state = self.auth.lock();
        state
            .access_tokens
            .get(access_token)
            .and_then(|user_id| state.user_by_id(user_id))
            .cloned()
            .ok_or_else(|| BackendError::auth(Some(401), "Invalid JWT"))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession> {
        let mut state = self.auth.lock();

        let user = state
            .refresh_tokens
            .remove(refresh_token)
            .and_then(|user_id| state.user_by_id(&user_id).cloned())
            .ok_or_else(|| {
                BackendError::auth(Some(400), "Invalid Refresh Token: Refresh Token Not Found")
            })?;

        Ok(self.issue_session(&mut state, user))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl RowStore for MemoryBackend {
    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        self.check_table(table)?;
        let row = with_defaults(table, row)?;

        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());

        Ok(row)
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        self.check_table(table)?;
        let tables = self.tables.lock();
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut selected: Vec<Row> = rows
            .iter()
            .filter(|row| query.filter.matches(row))
            .cloned()
            .collect();

        if let Some(order) = &query.order {
            // Newest-inserted first on ties when descending
            if !order.ascending {
                selected.reverse();
            }
            selected.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        if let Some(limit) = query.limit {
            selected.truncate(limit);
        }

        Ok(selected)
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Row) -> Result<Vec<Row>> {
        self.check_table(table)?;
        let Value::Object(patch) = patch else {
            return Err(BackendError::store(table, "patch must be a JSON object"));
        };

        let mut tables = self.tables.lock();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| filter.matches(row)) {
            if let Value::Object(fields) = row {
                fields.extend(patch.clone());
            }
            updated.push(row.clone());
        }

        Ok(updated)
    }

    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Row> {
        self.check_table(table)?;
        let key = match row.get(on_conflict) {
            Some(Value::String(s)) => s.clone(),
            Some(other) if !other.is_null() => other.to_string(),
            _ => {
                return Err(BackendError::store(
                    table,
                    format!("upsert row is missing conflict column '{on_conflict}'"),
                ));
            }
        };

        let mut tables = self.tables.lock();
        let rows = tables.entry(table.to_string()).or_default();

        if let Some(existing) = rows
            .iter_mut()
            .find(|existing| value_equals(existing.get(on_conflict), &key))
        {
            if let (Value::Object(fields), Value::Object(incoming)) = (&mut *existing, row) {
                fields.extend(incoming);
            }
            return Ok(existing.clone());
        }

        let row = with_defaults(table, row)?;
        rows.push(row.clone());
        Ok(row)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Fill the `id` and `created_at` defaults every hosted table has
fn with_defaults(table: &str, row: Row) -> Result<Row> {
    let Value::Object(mut fields) = row else {
        return Err(BackendError::store(table, "row must be a JSON object"));
    };

    fields
        .entry("id")
        .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
    fields.entry("created_at").or_insert_with(|| {
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
    });

    Ok(Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_fills_defaults() {
        let backend = MemoryBackend::new();
        let row = backend
            .insert("contact_submissions", json!({"name": "Jane"}))
            .await
            .unwrap();

        assert!(row["id"].is_string());
        assert!(row["created_at"].is_string());
        assert_eq!(backend.rows("contact_submissions").len(), 1);
    }

    #[tokio::test]
    async fn test_insert_keeps_explicit_id() {
        let backend = MemoryBackend::new();
        let row = backend
            .insert("user_profiles", json!({"id": "u1", "email": "a@b.co"}))
            .await
            .unwrap();
        assert_eq!(row["id"], "u1");
    }

    #[tokio::test]
    async fn test_select_order_and_limit() {
        let backend = MemoryBackend::new();
        for (i, ts) in ["2025-01-01", "2025-03-01", "2025-02-01"].iter().enumerate() {
            backend
                .insert(
                    "user_activities",
                    json!({"user_id": "u1", "n": i, "created_at": ts}),
                )
                .await
                .unwrap();
        }
        backend
            .insert("user_activities", json!({"user_id": "u2", "created_at": "2025-04-01"}))
            .await
            .unwrap();

        let query = Query::new()
            .eq("user_id", "u1")
            .order_by("created_at", false)
            .limit(2);
        let rows = backend.select("user_activities", &query).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["created_at"], "2025-03-01");
        assert_eq!(rows[1]["created_at"], "2025-02-01");
    }

    #[tokio::test]
    async fn test_descending_ties_newest_first() {
        let backend = MemoryBackend::new();
        for n in 0..3 {
            backend
                .insert("t", json!({"n": n, "created_at": "same"}))
                .await
                .unwrap();
        }

        let rows = backend
            .select("t", &Query::new().order_by("created_at", false))
            .await
            .unwrap();
        let order: Vec<i64> = rows.iter().map(|r| r["n"].as_i64().unwrap()).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let backend = MemoryBackend::new();
        backend
            .insert("user_profiles", json!({"id": "u1", "bio": null, "role": "user"}))
            .await
            .unwrap();

        let updated = backend
            .update(
                "user_profiles",
                &Filter::new().eq("id", "u1"),
                json!({"bio": "hello"}),
            )
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["bio"], "hello");
        assert_eq!(updated[0]["role"], "user");
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_on_key() {
        let backend = MemoryBackend::new();
        let table = "newsletter_subscriptions";

        let first = backend
            .upsert(table, json!({"email": "a@b.co", "status": "active"}), "email")
            .await
            .unwrap();
        let second = backend
            .upsert(
                table,
                json!({"email": "a@b.co", "status": "active", "user_id": "u1"}),
                "email",
            )
            .await
            .unwrap();

        assert_eq!(backend.rows(table).len(), 1);
        assert_eq!(first["id"], second["id"]);
        assert_eq!(second["user_id"], "u1");
    }

    #[tokio::test]
    async fn test_upsert_requires_conflict_column() {
        let backend = MemoryBackend::new();
        let result = backend
            .upsert("newsletter_subscriptions", json!({"status": "active"}), "email")
            .await;
        assert!(matches!(result, Err(BackendError::Store { .. })));
    }

    #[tokio::test]
    async fn test_failing_table() {
        let backend = MemoryBackend::new();
        backend.fail_table("contact_submissions");

        let result = backend.insert("contact_submissions", json!({})).await;
        assert!(matches!(result, Err(BackendError::Store { .. })));
        assert!(backend.rows("contact_submissions").is_empty());

        backend.heal_table("contact_submissions");
        assert!(backend.insert("contact_submissions", json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_in_invalid_credentials() {
        let backend = MemoryBackend::new();
        backend.create_user("jane@example.com", "secret1", UserMetadata::new());

        let err = backend
            .sign_in_with_password("jane@example.com", "wrongpass")
            .await
            .unwrap_err();
        assert_eq!(err.auth_message(), Some("Invalid login credentials"));

        let err = backend
            .sign_in_with_password("nobody@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(err.auth_message(), Some("Invalid login credentials"));
    }

    #[tokio::test]
    async fn test_sign_up_requires_confirmation() {
        let backend = MemoryBackend::new();
        let result = backend
            .sign_up("new@example.com", "secret1", UserMetadata::new())
            .await
            .unwrap();
        assert!(result.user.is_some());
        assert!(result.session.is_none());

        let err = backend
            .sign_in_with_password("new@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(err.auth_message(), Some("Email not confirmed"));

        assert!(backend.confirm_email("new@example.com"));
        assert!(
            backend
                .sign_in_with_password("new@example.com", "secret1")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_sign_up_duplicate() {
        let backend = MemoryBackend::new().auto_confirm();
        let first = backend
            .sign_up("dup@example.com", "secret1", UserMetadata::new())
            .await
            .unwrap();
        assert!(first.session.is_some());

        let err = backend
            .sign_up("DUP@example.com", "secret1", UserMetadata::new())
            .await
            .unwrap_err();
        assert_eq!(err.auth_message(), Some("User already registered"));
    }

    #[tokio::test]
    async fn test_tokens_round_trip() {
        let backend = MemoryBackend::new();
        let user = backend.create_user("jane@example.com", "secret1", UserMetadata::new());

        let session = backend
            .sign_in_with_password("jane@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(backend.get_user(&session.access_token).await.unwrap(), user);

        let refreshed = backend
            .refresh_session(&session.refresh_token)
            .await
            .unwrap();
        assert_ne!(refreshed.access_token, session.access_token);
        assert!(backend.refresh_session(&session.refresh_token).await.is_err());

        backend.sign_out(&refreshed.access_token).await.unwrap();
        assert!(backend.get_user(&refreshed.access_token).await.is_err());
    }
}
