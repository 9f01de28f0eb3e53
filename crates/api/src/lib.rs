//! Folio API
//!
//! HTTP surface of the portfolio site backend.
//!
//! # Overview
//!
//! Hosts the lead-capture actions (contact form, newsletter) and one auth
//! session per browser, identified by the `folio_session` cookie. Built on
//! Axum over the `folio-control` user service and `folio-auth` session
//! manager.
//!
//! # Usage
//!
//! ```ignore
//! use folio_api::{build_router, AppState};
//! use folio_backend::{BackendClient, MemoryBackend};
//!
//! let backend = BackendClient::memory(Arc::new(MemoryBackend::new()));
//! let app = build_router(AppState::new(backend));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! ```
//!
//! # Endpoints
//!
//! ## Operations
//! - `GET /health` - Liveness
//!
//! ## Lead capture
//! - `POST /api/v1/contact` - Contact form
//! - `POST /api/v1/newsletter` - Newsletter signup
//!
//! ## Auth
//! - `POST /api/v1/auth/login` - Sign in the browser session
//! - `POST /api/v1/auth/signup` - Create an account
//! - `POST /api/v1/auth/logout` - Sign out and end the browser session
//! - `GET /api/v1/auth/session` - Current session user
//! - `PATCH /api/v1/auth/profile` - Edit own profile
//!
//! ## User
//! - `GET /api/v1/user/activities?limit=N` - Own activity log
//! - `POST /api/v1/user/page-views` - Record a page view
//!
//! Action endpoints answer `{success, message, errors?}` with 200 on
//! success, 422 on validation failure, 401 on rejected credentials, 400 on
//! failed signup and 500 when the store write fails.

pub mod actions;
pub mod audit;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;

// Re-exports
pub use actions::{ActionReply, ActionResult};
pub use audit::{AuditAction, audit_layer};
pub use error::{ApiError, Result};
pub use routes::{RouterOptions, build_router, build_router_with_options};
pub use session::{SESSION_COOKIE, SessionRegistry};
pub use state::AppState;
pub use validation::FieldError;
