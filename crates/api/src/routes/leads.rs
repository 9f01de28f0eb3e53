//! Lead-capture routes
//!
//! Thin HTTP wrappers over [`crate::actions`].

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    routing::post,
};

use crate::actions::{self, ActionReply};
use crate::error::Result;
use crate::session::{BrowserSession, ClientContext};
use crate::state::AppState;
use crate::validation::{ContactForm, NewsletterForm};

/// Lead-capture routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/contact", post(contact))
        .route("/newsletter", post(newsletter))
}

/// Contact form endpoint
///
/// POST /api/v1/contact
async fn contact(
    State(state): State<AppState>,
    BrowserSession(session): BrowserSession,
    ClientContext(context): ClientContext,
    headers: HeaderMap,
    payload: std::result::Result<Json<ContactForm>, JsonRejection>,
) -> Result<ActionReply> {
    let Json(form) = payload?;
    Ok(actions::submit_contact_form(&state, form, session.as_ref(), &headers, &context).await)
}

/// Newsletter signup endpoint
///
/// POST /api/v1/newsletter
async fn newsletter(
    State(state): State<AppState>,
    BrowserSession(session): BrowserSession,
    ClientContext(context): ClientContext,
    headers: HeaderMap,
    payload: std::result::Result<Json<NewsletterForm>, JsonRejection>,
) -> Result<ActionReply> {
    let Json(form) = payload?;
    Ok(actions::subscribe_to_newsletter(&state, form, session.as_ref(), &headers, &context).await)
}
