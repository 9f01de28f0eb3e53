//! Integration tests for signed-in user endpoints and operations routes
//!
//! Tests: activity log reads, page-view tracking, health, audit middleware

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use folio_api::{AppState, RouterOptions, build_router, build_router_with_options};
use folio_backend::{BackendClient, MemoryBackend, UserMetadata};

fn test_app() -> (Router, Arc<MemoryBackend>) {
    let memory = Arc::new(MemoryBackend::new());
    memory.create_user("jane@example.com", "secret1", UserMetadata::new());
    let state = AppState::new(BackendClient::memory(Arc::clone(&memory)));
    (build_router(state), memory)
}

async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(json!({}))
}

async fn login(router: &Router) -> String {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"email": "jane@example.com", "password": "secret1"}).to_string(),
        ))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    cookie.split(';').next().unwrap().to_string()
}

async fn activities(router: &Router, cookie: Option<&str>, query: &str) -> axum::response::Response {
    let mut builder = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/v1/user/activities{query}"));
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn page_view(router: &Router, cookie: Option<&str>, path: &str) -> axum::response::Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/user/page-views")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::USER_AGENT, "integration-test");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    router
        .clone()
        .oneshot(
            builder
                .body(Body::from(json!({"path": path}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_activities_require_session() {
    let (router, _memory) = test_app();

    let response = activities(&router, None, "").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = activities(&router, Some("folio_session=unknown"), "").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Session is checked before the query
    let response = activities(&router, None, "?limit=0").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = activities(&router, None, "?limit=lots").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_page_views_listed_newest_first() {
    let (router, _memory) = test_app();
    let cookie = login(&router).await;

    let response = page_view(&router, Some(&cookie), "/blog/first-post").await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response_json(response).await["success"], true);

    let response = activities(&router, Some(&cookie), "").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    let entries = json["activities"].as_array().unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["activity_type"], "page_view");
    assert_eq!(entries[0]["activity_data"], json!({"path": "/blog/first-post"}));
    assert_eq!(entries[0]["user_agent"], "integration-test");
    assert_eq!(entries[1]["activity_type"], "login");
}

#[tokio::test]
async fn test_activities_limit() {
    let (router, _memory) = test_app();
    let cookie = login(&router).await;
    page_view(&router, Some(&cookie), "/").await;

    let json = response_json(activities(&router, Some(&cookie), "?limit=1").await).await;
    assert_eq!(json["activities"].as_array().unwrap().len(), 1);

    let response = activities(&router, Some(&cookie), "?limit=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = activities(&router, Some(&cookie), "?limit=lots").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_page_view_validation_and_auth() {
    let (router, memory) = test_app();

    let response = page_view(&router, None, "/about").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookie = login(&router).await;
    let response = page_view(&router, Some(&cookie), "about").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response_json(response).await["errors"][0]["message"],
        "Path must start with /"
    );

    assert_eq!(memory.rows("user_activities").len(), 1);
}

#[tokio::test]
async fn test_health() {
    let (router, _memory) = test_app();

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response_json(response).await,
        json!({"status": "ok", "sessions": 0})
    );
}

#[tokio::test]
async fn test_audit_layer_passes_requests_through() {
    let memory = Arc::new(MemoryBackend::new());
    let state = AppState::new(BackendClient::memory(memory));
    let router = build_router_with_options(
        state,
        RouterOptions {
            audit_logging: true,
        },
    );

    let response = router
        .clone()
        .oneshot(
            Request::get("/health")
                .header("x-forwarded-for", "203.0.113.1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(Request::get("/api/v1/user/activities").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
