//! Lead-capture actions
//!
//! Contact and newsletter submissions run in three phases:
//!
//! 1. validate the form (nothing reaches the backend on failure)
//! 2. resolve who is submitting (optional, anonymous is fine)
//! 3. persist through the [`UserService`](folio_control::UserService)
//!
//! The newsletter action adds a fourth, best-effort phase: forwarding the
//! subscriber to the external mailing list. Its outcome is only logged; the
//! result is fixed once phase 3 has succeeded or failed.

use axum::Json;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use folio_control::{ContactSubmission, RequestContext};
use folio_mailing::Subscriber;

use crate::audit::AuditAction;
use crate::session::ActiveSession;
use crate::state::AppState;
use crate::validation::{self, ContactForm, FieldError, NewsletterForm};
use crate::{audit, audit_fail};

pub const CONTACT_SUCCESS: &str = "Message sent successfully";
pub const CONTACT_INVALID: &str = "Invalid form data";
pub const CONTACT_FAILED: &str = "Failed to send message. Please try again.";

pub const NEWSLETTER_SUCCESS: &str = "Successfully subscribed to newsletter";
pub const NEWSLETTER_INVALID: &str = "Please check all fields and try again";
pub const NEWSLETTER_FAILED: &str = "Failed to subscribe. Please try again.";

/// Outcome of an action as returned to the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            errors: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: None,
        }
    }

    pub fn invalid(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: Some(errors),
        }
    }
}

/// An [`ActionResult`] paired with the status code it is sent with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReply {
    pub status: StatusCode,
    pub result: ActionResult,
}

impl ActionReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            result: ActionResult::success(message),
        }
    }

    pub fn failed(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            result: ActionResult::failure(message),
        }
    }

    pub fn invalid(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            result: ActionResult::invalid(message, errors),
        }
    }
}

impl IntoResponse for ActionReply {
    fn into_response(self) -> Response {
        (self.status, Json(self.result)).into_response()
    }
}

// =============================================================================
// Identity
// =============================================================================

/// User id behind a request, if any
///
/// The browser session's auth client is consulted first, then a bearer
/// access token. Lookup failures count as anonymous.
pub async fn resolve_user_id(
    state: &AppState,
    session: Option<&ActiveSession>,
    headers: &HeaderMap,
) -> Option<String> {
    if let Some(session) = session {
        match session.manager.auth().get_session().await {
            Ok(Some(current)) => return Some(current.user.id),
            Ok(None) => {}
            Err(e) => debug!(error = %e, "Session lookup failed"),
        }
    }

    let token = bearer_token(headers)?;
    match state.backend.auth().get_user(token).await {
        Ok(user) => Some(user.id),
        Err(e) => {
            debug!(error = %e, "Bearer token rejected, treating as anonymous");
            None
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Actions
// =============================================================================

/// Store a contact form submission
pub async fn submit_contact_form(
    state: &AppState,
    form: ContactForm,
    session: Option<&ActiveSession>,
    headers: &HeaderMap,
    context: &RequestContext,
) -> ActionReply {
    if let Err(errors) = validation::check(&form) {
        debug!(fields = errors.len(), "Contact form rejected");
        return ActionReply::invalid(CONTACT_INVALID, errors);
    }

    let user_id = resolve_user_id(state, session, headers).await;

    let submission = ContactSubmission {
        name: form.name,
        email: form.email,
        subject: form.subject,
        message: form.message,
    };

    if !state
        .users
        .submit_contact_form(&submission, user_id.as_deref(), Some(context))
        .await
    {
        audit_fail!(AuditAction::ContactSubmit, "persistence failed", user_id = ?user_id);
        return ActionReply::failed(StatusCode::INTERNAL_SERVER_ERROR, CONTACT_FAILED);
    }

    audit!(AuditAction::ContactSubmit, user_id = ?user_id, subject = %submission.subject);
    ActionReply::ok(CONTACT_SUCCESS)
}

/// Subscribe to the newsletter, then forward to the mailing list
pub async fn subscribe_to_newsletter(
    state: &AppState,
    form: NewsletterForm,
    session: Option<&ActiveSession>,
    headers: &HeaderMap,
    context: &RequestContext,
) -> ActionReply {
    if let Err(errors) = validation::check(&form) {
        debug!(fields = errors.len(), "Newsletter form rejected");
        return ActionReply::invalid(NEWSLETTER_INVALID, errors);
    }

    let user_id = resolve_user_id(state, session, headers).await;

    if !state
        .users
        .subscribe_to_newsletter(&form.email, user_id.as_deref(), Some(context))
        .await
    {
        audit_fail!(AuditAction::NewsletterSubscribe, "persistence failed", user_id = ?user_id);
        return ActionReply::failed(StatusCode::INTERNAL_SERVER_ERROR, NEWSLETTER_FAILED);
    }

    audit!(AuditAction::NewsletterSubscribe, user_id = ?user_id);
    forward_to_mailing_list(state, form).await;

    ActionReply::ok(NEWSLETTER_SUCCESS)
}

async fn forward_to_mailing_list(state: &AppState, form: NewsletterForm) {
    let Some(list) = &state.mailing else {
        return;
    };

    let subscriber = Subscriber {
        email: form.email,
        first_name: form.first_name,
        last_name: form.last_name,
    };

    match list.subscribe(&subscriber).await {
        Ok(()) => info!(list = list.name(), "Subscriber forwarded to mailing list"),
        Err(e) => warn!(list = list.name(), error = %e, "Mailing list forward failed"),
    }
}
