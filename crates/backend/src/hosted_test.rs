//! Tests for HostedBackend
//!
//! Tests cover request shapes sent to the auth and row endpoints and the
//! mapping of their responses and errors.

use httpmock::prelude::*;
use serde_json::json;

use crate::{
    AuthProvider, BackendError, Filter, HostedBackend, HostedConfig, Query, RowStore, UserMetadata,
};

fn backend(server: &MockServer) -> HostedBackend {
    HostedBackend::new(HostedConfig::new(server.base_url(), "anon").with_service_key("service"))
        .unwrap()
}

fn session_body(user_id: &str) -> serde_json::Value {
    json!({
        "access_token": "access-1",
        "refresh_token": "refresh-1",
        "token_type": "bearer",
        "expires_in": 3600,
        "user": {
            "id": user_id,
            "email": "jane@example.com",
            "user_metadata": { "full_name": "Jane Doe" }
        }
    })
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn test_sign_in_posts_password_grant() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/auth/v1/token")
            .query_param("grant_type", "password")
            .header("apikey", "anon")
            .json_body(json!({"email": "jane@example.com", "password": "secret1"}));
        then.status(200).json_body(session_body("u1"));
    });

    let session = backend(&server)
        .sign_in_with_password("jane@example.com", "secret1")
        .await
        .unwrap();

    mock.assert();
    assert_eq!(session.access_token, "access-1");
    assert_eq!(session.user.id, "u1");
    assert_eq!(session.user.display_name(), Some("Jane Doe"));
    assert!(session.expires_at.is_some());
    assert!(!session.is_expired());
}

#[tokio::test]
async fn test_sign_in_error_message_is_surfaced() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/auth/v1/token");
        then.status(400).json_body(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        }));
    });

    let err = backend(&server)
        .sign_in_with_password("jane@example.com", "wrong")
        .await
        .unwrap_err();

    assert_eq!(err.auth_message(), Some("Invalid login credentials"));
    assert!(matches!(err, BackendError::Auth { status: Some(400), .. }));
}

#[tokio::test]
async fn test_sign_in_server_error_is_not_a_rejection() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/auth/v1/token");
        then.status(502);
    });

    let err = backend(&server)
        .sign_in_with_password("jane@example.com", "secret1")
        .await
        .unwrap_err();

    assert!(err.auth_message().is_none());
    assert!(matches!(err, BackendError::Unavailable { status: 502, .. }));
}

#[tokio::test]
async fn test_sign_up_without_session() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/auth/v1/signup").json_body(json!({
            "email": "new@example.com",
            "password": "secret1",
            "data": { "full_name": "New User" }
        }));
        then.status(200).json_body(json!({
            "id": "u2",
            "email": "new@example.com",
            "user_metadata": { "full_name": "New User" }
        }));
    });

    let mut metadata = UserMetadata::new();
    metadata.insert("full_name".into(), json!("New User"));

    let result = backend(&server)
        .sign_up("new@example.com", "secret1", metadata)
        .await
        .unwrap();

    mock.assert();
    assert_eq!(result.user.unwrap().id, "u2");
    assert!(result.session.is_none());
}

#[tokio::test]
async fn test_sign_up_with_session() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/auth/v1/signup");
        then.status(200).json_body(session_body("u3"));
    });

    let result = backend(&server)
        .sign_up("jane@example.com", "secret1", UserMetadata::new())
        .await
        .unwrap();

    assert_eq!(result.user.unwrap().id, "u3");
    assert_eq!(result.session.unwrap().refresh_token, "refresh-1");
}

#[tokio::test]
async fn test_sign_up_rejected_uses_msg_field() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/auth/v1/signup");
        then.status(422)
            .json_body(json!({"code": 422, "msg": "User already registered"}));
    });

    let err = backend(&server)
        .sign_up("jane@example.com", "secret1", UserMetadata::new())
        .await
        .unwrap_err();

    assert_eq!(err.auth_message(), Some("User already registered"));
}

#[tokio::test]
async fn test_sign_out_sends_access_token() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/auth/v1/logout")
            .header("authorization", "Bearer access-1");
        then.status(204);
    });

    backend(&server).sign_out("access-1").await.unwrap();
    mock.assert();
}

#[tokio::test]
async fn test_get_user() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/auth/v1/user")
            .header("authorization", "Bearer access-1");
        then.status(200)
            .json_body(json!({"id": "u1", "email": "jane@example.com"}));
    });

    let user = backend(&server).get_user("access-1").await.unwrap();
    assert_eq!(user.id, "u1");
    assert!(user.user_metadata.is_empty());
}

#[tokio::test]
async fn test_refresh_posts_refresh_grant() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/auth/v1/token")
            .query_param("grant_type", "refresh_token")
            .json_body(json!({"refresh_token": "refresh-0"}));
        then.status(200).json_body(session_body("u1"));
    });

    let session = backend(&server)
        .refresh_session("refresh-0")
        .await
        .unwrap();

    mock.assert();
    assert_eq!(session.refresh_token, "refresh-1");
}

// =============================================================================
// Rows
// =============================================================================

#[tokio::test]
async fn test_insert_uses_service_key_and_returns_row() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/contact_submissions")
            .header("apikey", "service")
            .header("authorization", "Bearer service")
            .header("prefer", "return=representation");
        then.status(201)
            .json_body(json!([{"id": "c1", "name": "Jane"}]));
    });

    let row = backend(&server)
        .insert("contact_submissions", json!({"name": "Jane"}))
        .await
        .unwrap();

    mock.assert();
    assert_eq!(row["id"], "c1");
}

#[tokio::test]
async fn test_select_builds_query() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/user_activities")
            .query_param("select", "*")
            .query_param("user_id", "eq.u1")
            .query_param("order", "created_at.desc")
            .query_param("limit", "5");
        then.status(200)
            .json_body(json!([{"id": "a1"}, {"id": "a2"}]));
    });

    let query = Query::new()
        .eq("user_id", "u1")
        .order_by("created_at", false)
        .limit(5);
    let rows = backend(&server)
        .select("user_activities", &query)
        .await
        .unwrap();

    mock.assert();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_update_filters_rows() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PATCH)
            .path("/rest/v1/user_profiles")
            .query_param("id", "eq.u1")
            .json_body(json!({"bio": "hello"}));
        then.status(200)
            .json_body(json!([{"id": "u1", "bio": "hello"}]));
    });

    let rows = backend(&server)
        .update(
            "user_profiles",
            &Filter::new().eq("id", "u1"),
            json!({"bio": "hello"}),
        )
        .await
        .unwrap();

    mock.assert();
    assert_eq!(rows[0]["bio"], "hello");
}

#[tokio::test]
async fn test_upsert_merges_on_conflict() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/newsletter_subscriptions")
            .query_param("on_conflict", "email")
            .header("prefer", "resolution=merge-duplicates,return=representation");
        then.status(201)
            .json_body(json!([{"id": "n1", "email": "a@b.co"}]));
    });

    let row = backend(&server)
        .upsert(
            "newsletter_subscriptions",
            json!({"email": "a@b.co", "status": "active"}),
            "email",
        )
        .await
        .unwrap();

    mock.assert();
    assert_eq!(row["id"], "n1");
}

#[tokio::test]
async fn test_row_error_maps_to_store() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/rest/v1/contact_submissions");
        then.status(400).json_body(json!({
            "code": "23502",
            "message": "null value in column \"email\" violates not-null constraint"
        }));
    });

    let err = backend(&server)
        .insert("contact_submissions", json!({}))
        .await
        .unwrap_err();

    match err {
        BackendError::Store { table, message } => {
            assert_eq!(table, "contact_submissions");
            assert!(message.contains("not-null"));
        }
        other => panic!("expected store error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_insert_response_is_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/rest/v1/user_activities");
        then.status(201).json_body(json!([]));
    });

    let result = backend(&server)
        .insert("user_activities", json!({"user_id": "u1"}))
        .await;

    assert!(matches!(result, Err(BackendError::Store { .. })));
}
