//! Audit logging middleware
//!
//! Logs security-relevant operations: sign-ins, account creation, profile
//! edits and lead submissions.
//!
//! # Output
//!
//! Uses `tracing` with structured fields under the `audit` target. Route it
//! to its own file or sink with a target filter on the subscriber.
//!
//! # Example log entry
//!
//! ```json
//! {
//!   "timestamp": "2025-06-02T10:30:00Z",
//!   "level": "INFO",
//!   "target": "audit",
//!   "action": "auth.login.success",
//!   "user_id": "5f1c9a6e-...",
//!   "method": "POST",
//!   "path": "/api/v1/auth/login",
//!   "client_ip": "192.168.1.1"
//! }
//! ```

use axum::{body::Body, extract::Request, middleware::Next, response::Response};
use tracing::{Instrument, warn};

/// Audit event action types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    // Auth
    LoginSuccess,
    LoginFailure,
    Signup,
    Logout,

    // Account
    ProfileUpdate,

    // Leads
    ContactSubmit,
    NewsletterSubscribe,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSuccess => "auth.login.success",
            Self::LoginFailure => "auth.login.failure",
            Self::Signup => "auth.signup",
            Self::Logout => "auth.logout",
            Self::ProfileUpdate => "profile.update",
            Self::ContactSubmit => "lead.contact",
            Self::NewsletterSubscribe => "lead.newsletter",
        }
    }
}

/// Log an audit event (call from handlers for business-level events)
#[macro_export]
macro_rules! audit {
    ($action:expr, $($field:tt)*) => {
        tracing::info!(
            target: "audit",
            action = $action.as_str(),
            $($field)*
        )
    };
}

/// Log a failed audit event
#[macro_export]
macro_rules! audit_fail {
    ($action:expr, $reason:expr, $($field:tt)*) => {
        tracing::warn!(
            target: "audit",
            action = $action.as_str(),
            status = "failure",
            reason = $reason,
            $($field)*
        )
    };
}

/// Middleware that adds audit context to all requests
///
/// Runs the request inside a span carrying the method, path and client IP
/// (from `X-Forwarded-For` or `X-Real-IP`), so `audit!` events raised by
/// handlers inherit them.
pub async fn audit_layer(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = client_ip(&request);

    let span = tracing::info_span!(
        target: "audit",
        "request",
        method = %method,
        path = %path,
        client_ip = %client_ip,
    );

    let response = next.run(request).instrument(span.clone()).await;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        span.in_scope(|| {
            warn!(
                target: "audit",
                status = %status.as_u16(),
                "request_completed"
            );
        });
    }

    response
}

fn client_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            request
                .headers()
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_strings() {
        assert_eq!(AuditAction::LoginSuccess.as_str(), "auth.login.success");
        assert_eq!(AuditAction::ContactSubmit.as_str(), "lead.contact");
        assert_eq!(AuditAction::NewsletterSubscribe.as_str(), "lead.newsletter");
    }

    #[test]
    fn test_client_ip() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), "203.0.113.7");

        let request = Request::builder()
            .header("x-real-ip", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), "198.51.100.2");

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request), "unknown");
    }
}
