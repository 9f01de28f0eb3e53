//! Authentication routes
//!
//! Login, signup and logout for the browser session named by the session
//! cookie, plus the session snapshot and profile edits.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::Serialize;

use folio_auth::{SessionState, SessionUser};
use folio_control::ProfileUpdate;

use crate::actions::ActionReply;
use crate::audit::AuditAction;
use crate::error::{ApiError, Result};
use crate::routes::signed_in;
use crate::session::{
    ActiveSession, BrowserSession, ClientContext, expired_cookie, session_cookie, set_cookie,
};
use crate::state::AppState;
use crate::validation::{self, LoginForm, SignupForm};
use crate::{audit, audit_fail};

/// Sent with 422 when a login or signup form fails validation
pub const AUTH_INVALID: &str = "Invalid form data";
pub const LOGOUT_SUCCESS: &str = "Logged out";
pub const PROFILE_UPDATED: &str = "Profile updated";
pub const PROFILE_FAILED: &str = "Failed to update profile";

/// Auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/signup", post(signup))
        .route("/logout", post(logout))
        .route("/session", get(session))
        .route("/profile", patch(update_profile))
}

/// Session snapshot
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Option<SessionUser>,
    pub is_loading: bool,
    pub is_authenticated: bool,
}

impl From<SessionState> for SessionResponse {
    fn from(state: SessionState) -> Self {
        Self {
            is_authenticated: state.is_authenticated(),
            is_loading: state.is_loading,
            user: state.user,
        }
    }
}

/// Login endpoint
///
/// POST /api/v1/auth/login
///
/// Starts a browser session when the request carries none. A session
/// started here is kept, and its cookie set, only when the login succeeds.
async fn login(
    State(state): State<AppState>,
    BrowserSession(current): BrowserSession,
    ClientContext(context): ClientContext,
    payload: std::result::Result<Json<LoginForm>, JsonRejection>,
) -> Result<Response> {
    let Json(form) = payload?;
    if let Err(errors) = validation::check(&form) {
        return Ok(ActionReply::invalid(AUTH_INVALID, errors).into_response());
    }

    let created = current.is_none();
    let session = current.unwrap_or_else(|| state.sessions.create());
    session.manager.ready().await?;

    let outcome = session
        .manager
        .login(&form.email, &form.password, Some(&context))
        .await;

    let reply = if outcome.success {
        let settled = session.manager.settled().await?;
        let user_id = settled.user.as_ref().map(|u| u.id.as_str());
        audit!(AuditAction::LoginSuccess, user_id = ?user_id);
        ActionReply::ok(outcome.message)
    } else {
        audit_fail!(AuditAction::LoginFailure, "rejected", message = %outcome.message);
        ActionReply::failed(StatusCode::UNAUTHORIZED, outcome.message)
    };

    Ok(finish(&state, &session, created, reply))
}

/// Signup endpoint
///
/// POST /api/v1/auth/signup
async fn signup(
    State(state): State<AppState>,
    BrowserSession(current): BrowserSession,
    ClientContext(context): ClientContext,
    payload: std::result::Result<Json<SignupForm>, JsonRejection>,
) -> Result<Response> {
    let Json(form) = payload?;
    if let Err(errors) = validation::check(&form) {
        return Ok(ActionReply::invalid(AUTH_INVALID, errors).into_response());
    }

    let created = current.is_none();
    let session = current.unwrap_or_else(|| state.sessions.create());
    session.manager.ready().await?;

    let outcome = session
        .manager
        .signup(&form.name, &form.email, &form.password, Some(&context))
        .await;

    let reply = if outcome.success {
        // Settles the session when the provider signed the user straight in
        session.manager.settled().await?;
        audit!(AuditAction::Signup, status = "success");
        ActionReply::ok(outcome.message)
    } else {
        audit_fail!(AuditAction::Signup, "rejected", message = %outcome.message);
        ActionReply::failed(StatusCode::BAD_REQUEST, outcome.message)
    };

    Ok(finish(&state, &session, created, reply))
}

/// Keep a session started by this request only if the action succeeded
fn finish(
    state: &AppState,
    session: &ActiveSession,
    created: bool,
    reply: ActionReply,
) -> Response {
    if !created {
        return reply.into_response();
    }
    if !reply.result.success {
        state.sessions.remove(&session.id);
        return reply.into_response();
    }
    set_cookie(
        reply.into_response(),
        &session_cookie(&session.id, state.cookie_secure),
    )
}

/// Logout endpoint
///
/// POST /api/v1/auth/logout
///
/// Ends the browser session and expires its cookie. Without a session this
/// is a no-op that still succeeds.
async fn logout(
    State(state): State<AppState>,
    BrowserSession(current): BrowserSession,
    ClientContext(context): ClientContext,
) -> Result<Response> {
    let Some(session) = current else {
        return Ok(ActionReply::ok(LOGOUT_SUCCESS).into_response());
    };

    let before = session.manager.settled().await?;
    session.manager.logout(Some(&context)).await;
    session.manager.settled().await?;
    state.sessions.remove(&session.id);

    if let Some(user) = before.user {
        audit!(AuditAction::Logout, user_id = %user.id);
    }

    let response = ActionReply::ok(LOGOUT_SUCCESS).into_response();
    Ok(set_cookie(response, &expired_cookie(state.cookie_secure)))
}

/// Current session
///
/// GET /api/v1/auth/session
async fn session(BrowserSession(current): BrowserSession) -> Result<Json<SessionResponse>> {
    let Some(session) = current else {
        return Ok(Json(SessionResponse {
            user: None,
            is_loading: false,
            is_authenticated: false,
        }));
    };

    let state = session.manager.settled().await?;
    Ok(Json(state.into()))
}

/// Profile edit endpoint
///
/// PATCH /api/v1/auth/profile
async fn update_profile(
    BrowserSession(current): BrowserSession,
    ClientContext(context): ClientContext,
    payload: std::result::Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Response> {
    let (session, user) = signed_in(current).await?;
    let Json(updates) = payload?;
    if updates.is_empty() {
        return Err(ApiError::bad_request("no profile fields to update"));
    }

    if !session.manager.update_profile(&updates, Some(&context)).await {
        audit_fail!(AuditAction::ProfileUpdate, "update failed", user_id = %user.id);
        return Ok(
            ActionReply::failed(StatusCode::INTERNAL_SERVER_ERROR, PROFILE_FAILED).into_response(),
        );
    }

    audit!(AuditAction::ProfileUpdate, user_id = %user.id);
    Ok(ActionReply::ok(PROFILE_UPDATED).into_response())
}
