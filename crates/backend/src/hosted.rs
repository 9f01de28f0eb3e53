//! Hosted backend over HTTPS
//!
//! Auth goes to the GoTrue endpoints under `/auth/v1`, rows to PostgREST
//! under `/rest/v1/<table>`. Every request carries the project key in the
//! `apikey` header.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, trace, warn};

use crate::error::{BackendError, Result};
use crate::provider::AuthProvider;
use crate::rows::{Filter, Query, Row, RowStore};
use crate::types::{AuthSession, AuthUser, SignUp, UserMetadata};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the hosted backend
#[derive(Debug, Clone)]
pub struct HostedConfig {
    /// Project URL (e.g. `https://xyz.supabase.co`)
    pub url: String,
    /// Public (anon) key, used for auth calls
    pub anon_key: String,
    /// Privileged key for row-store calls; falls back to the anon key
    pub service_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl HostedConfig {
    /// Create a config with the anon key only
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            service_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use a privileged key for row-store calls
    pub fn with_service_key(mut self, key: impl Into<String>) -> Self {
        self.service_key = Some(key.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Hosted auth + row store
pub struct HostedBackend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    rows_key: String,
}

impl std::fmt::Debug for HostedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedBackend")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HostedBackend {
    /// Create a hosted backend client
    pub fn new(config: HostedConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let rows_key = config
            .service_key
            .unwrap_or_else(|| config.anon_key.clone());

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key,
            rows_key,
        })
    }

    // =========================================================================
    // Auth helpers
    // =========================================================================

    fn auth_request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let url = format!("{}/auth/v1{}", self.base_url, path);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<AuthSession> {
        let response = self
            .auth_request(Method::POST, &format!("/token?grant_type={grant_type}"), None)
            .json(&body)
            .send()
            .await?;

        let body: SessionBody = auth_json(response).await?;
        Ok(body.into_session())
    }

    // =========================================================================
    // Row helpers
    // =========================================================================

    fn rows_request(&self, method: Method, table: &str, params: &[(String, String)]) -> RequestBuilder {
        let mut url = format!("{}/rest/v1/{}", self.base_url, table);
        if !params.is_empty() {
            let query: Vec<String> = params
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }

        self.http
            .request(method, url)
            .header("apikey", &self.rows_key)
            .bearer_auth(&self.rows_key)
    }
}

/// PostgREST filter parameters (`column=eq.value`)
fn filter_params(filter: &Filter) -> Vec<(String, String)> {
    filter
        .conditions()
        .iter()
        .map(|(column, value)| (column.clone(), format!("eq.{value}")))
        .collect()
}

#[async_trait]
impl AuthProvider for HostedBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<SignUp> {
        let response = self
            .auth_request(Method::POST, "/signup", None)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;

        match auth_json::<SignUpBody>(response).await? {
            SignUpBody::Session(body) => {
                let session = body.into_session();
                Ok(SignUp {
                    user: Some(session.user.clone()),
                    session: Some(session),
                })
            }
            SignUpBody::User(user) => Ok(SignUp {
                user: Some(user),
                session: None,
            }),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .auth_request(Method::POST, "/logout", Some(access_token))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(auth_error(response).await)
        }
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        let response = self
            .auth_request(Method::GET, "/user", Some(access_token))
            .send()
            .await?;

        auth_json(response).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    fn name(&self) -> &'static str {
        "hosted"
    }
}

#[async_trait]
impl RowStore for HostedBackend {
    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        let response = self
            .rows_request(Method::POST, table, &[])
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;

        let rows = rows_json(table, response).await?;
        first_row(table, rows)
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(filter_params(&query.filter));
        if let Some(order) = &query.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        trace!(table, ?params, "Selecting rows");
        let response = self.rows_request(Method::GET, table, &params).send().await?;
        rows_json(table, response).await
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Row) -> Result<Vec<Row>> {
        let response = self
            .rows_request(Method::PATCH, table, &filter_params(filter))
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;

        rows_json(table, response).await
    }

    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Row> {
        let params = [("on_conflict".to_string(), on_conflict.to_string())];
        let response = self
            .rows_request(Method::POST, table, &params)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&row)
            .send()
            .await?;

        let rows = rows_json(table, response).await?;
        first_row(table, rows)
    }

    fn name(&self) -> &'static str {
        "hosted"
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct SessionBody {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl SessionBody {
    fn into_session(self) -> AuthSession {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| Utc::now().timestamp() + secs));

        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            expires_at,
            user: self.user,
        }
    }
}

/// Sign-up returns a session when confirmation is off, a bare user otherwise
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpBody {
    Session(SessionBody),
    User(AuthUser),
}

/// Error body; providers disagree on which field carries the message
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .filter(|m| !m.is_empty())
    }
}

async fn auth_error(response: Response) -> BackendError {
    let status = response.status();
    let body: ErrorBody = response.json().await.unwrap_or_default();
    let message = body.into_message().unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("authentication failed")
            .to_string()
    });

    if !status.is_client_error() {
        warn!(status = status.as_u16(), %message, "Auth service error");
        return BackendError::unavailable(status.as_u16(), message);
    }

    debug!(status = status.as_u16(), %message, "Auth request rejected");
    BackendError::auth(Some(status.as_u16()), message)
}

async fn auth_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(auth_error(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| BackendError::decode(e.to_string()))
}

async fn rows_json(table: &str, response: Response) -> Result<Vec<Row>> {
    let status = response.status();
    if !status.is_success() {
        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .into_message()
            .unwrap_or_else(|| format!("status {}", status.as_u16()));
        return Err(BackendError::store(table, message));
    }

    response
        .json()
        .await
        .map_err(|e| BackendError::decode(e.to_string()))
}

fn first_row(table: &str, rows: Vec<Row>) -> Result<Row> {
    rows.into_iter()
        .next()
        .ok_or_else(|| BackendError::store(table, "no row returned"))
}
