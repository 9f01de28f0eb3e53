//! Folio - Backend Client
//!
//! Narrow interface to the hosted backend-as-a-service the site runs on.
//!
//! # Overview
//!
//! Two subsystems sit behind one shared handle, [`BackendClient`]:
//!
//! | Subsystem | Trait | Operations |
//! |-----------|-------|------------|
//! | Auth | [`AuthProvider`] | sign in, sign up, sign out, get user, refresh |
//! | Rows | [`RowStore`] | insert, select, update, upsert |
//!
//! The auth provider is stateless. Session state lives in an [`AuthClient`],
//! one per browser session, which stores the current session and broadcasts
//! an [`AuthEvent`] every time it changes.
//!
//! # Implementations
//!
//! - [`HostedBackend`] - GoTrue (`/auth/v1`) + PostgREST (`/rest/v1`) over HTTPS
//! - [`MemoryBackend`] - in-process tables and accounts for development and tests
//!
//! # Example
//!
//! ```ignore
//! use folio_backend::{BackendClient, HostedBackend, HostedConfig};
//!
//! let hosted = HostedBackend::new(HostedConfig::new(url, anon_key))?;
//! let backend = BackendClient::hosted(hosted);
//!
//! let auth = backend.auth_client();
//! let mut events = auth.on_auth_state_change();
//! auth.sign_in_with_password("user@example.com", "secret").await?;
//! ```

mod client;
mod error;
mod hosted;
mod memory;
mod provider;
mod rows;
mod types;

#[cfg(test)]
mod hosted_test;

pub use client::{AuthClient, BackendClient};
pub use error::{BackendError, Result};
pub use hosted::{HostedBackend, HostedConfig};
pub use memory::MemoryBackend;
pub use provider::AuthProvider;
pub use rows::{Filter, Order, Query, Row, RowStore};
pub use types::{AuthChange, AuthEvent, AuthSession, AuthUser, SignUp, UserMetadata};
