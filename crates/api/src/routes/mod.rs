//! API routes
//!
//! Domain-grouped HTTP route handlers.

pub mod auth;
pub mod leads;
pub mod ops;
pub mod user;

use axum::{Router, middleware};

use folio_auth::SessionUser;

use crate::audit::audit_layer;
use crate::error::{ApiError, Result};
use crate::session::ActiveSession;
use crate::state::AppState;

/// Options for building the router
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// Enable audit logging middleware
    pub audit_logging: bool,
}

/// Build the complete API router
pub fn build_router(state: AppState) -> Router {
    build_router_with_options(state, RouterOptions::default())
}

/// Build the complete API router with options
pub fn build_router_with_options(state: AppState, options: RouterOptions) -> Router {
    let router = Router::new()
        // Operations routes (health - no session)
        .merge(ops::routes())
        // Lead capture (contact, newsletter - anonymous allowed)
        .nest("/api/v1", leads::routes())
        // Browser session auth
        .nest("/api/v1/auth", auth::routes())
        // Signed-in user (activities, page views)
        .nest("/api/v1/user", user::routes());

    // Conditionally add audit logging middleware
    let router = if options.audit_logging {
        router.layer(middleware::from_fn(audit_layer))
    } else {
        router
    };

    router.with_state(state)
}

/// The session and its user, or 401 when nobody is signed in
pub(crate) async fn signed_in(
    session: Option<ActiveSession>,
) -> Result<(ActiveSession, SessionUser)> {
    let session = session.ok_or(ApiError::Unauthorized)?;
    let state = session.manager.settled().await?;
    let user = state.user.ok_or(ApiError::Unauthorized)?;
    Ok((session, user))
}
