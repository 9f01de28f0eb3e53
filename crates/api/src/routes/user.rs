//! Signed-in user routes
//!
//! Activity log reads and page-view tracking for the session user.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use folio_control::{Activity, DEFAULT_ACTIVITY_LIMIT, UserActivity};

use crate::actions::ActionReply;
use crate::error::{ApiError, Result};
use crate::routes::signed_in;
use crate::session::{BrowserSession, ClientContext};
use crate::state::AppState;
use crate::validation::{self, PageViewForm};

/// Largest page of activities a client may ask for
pub const MAX_ACTIVITY_LIMIT: usize = 200;

pub const PAGE_VIEW_RECORDED: &str = "Page view recorded";
pub const PAGE_VIEW_INVALID: &str = "Invalid page view";

/// User routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/activities", get(activities))
        .route("/page-views", post(page_view))
}

#[derive(Debug, Deserialize)]
pub struct ActivitiesQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ActivitiesResponse {
    pub activities: Vec<UserActivity>,
}

/// Most recent activity of the session user
///
/// GET /api/v1/user/activities?limit=N
async fn activities(
    State(state): State<AppState>,
    BrowserSession(current): BrowserSession,
    query: std::result::Result<Query<ActivitiesQuery>, QueryRejection>,
) -> Result<Json<ActivitiesResponse>> {
    let (_, user) = signed_in(current).await?;
    let Query(query) = query?;
    let limit = match query.limit {
        Some(0) => return Err(ApiError::bad_request("limit must be at least 1")),
        Some(limit) => limit.min(MAX_ACTIVITY_LIMIT),
        None => DEFAULT_ACTIVITY_LIMIT,
    };

    let activities = state.users.get_user_activities(&user.id, limit).await;

    Ok(Json(ActivitiesResponse { activities }))
}

/// Record a page view for the session user
///
/// POST /api/v1/user/page-views
async fn page_view(
    State(state): State<AppState>,
    BrowserSession(current): BrowserSession,
    ClientContext(context): ClientContext,
    payload: std::result::Result<Json<PageViewForm>, JsonRejection>,
) -> Result<ActionReply> {
    let (_, user) = signed_in(current).await?;
    let Json(form) = payload?;
    if let Err(errors) = validation::check(&form) {
        return Ok(ActionReply::invalid(PAGE_VIEW_INVALID, errors));
    }

    let activity = Activity::PageView { path: form.path };
    state
        .users
        .track_activity(&user.id, &activity, Some(&context))
        .await;

    Ok(ActionReply {
        status: StatusCode::ACCEPTED,
        ..ActionReply::ok(PAGE_VIEW_RECORDED)
    })
}
