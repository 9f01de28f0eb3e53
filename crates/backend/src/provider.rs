//! Auth provider boundary
//!
//! Stateless operations against the hosted auth subsystem. Session state is
//! kept by [`AuthClient`](crate::AuthClient), not here.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AuthSession, AuthUser, SignUp, UserMetadata};

/// Hosted auth subsystem
///
/// Rejections come back as [`BackendError::Auth`](crate::BackendError::Auth)
/// carrying the provider's message verbatim. Failures on the service side
/// are [`BackendError::Unavailable`](crate::BackendError::Unavailable).
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange email and password for a session
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// Register a new identity, attaching `metadata` to it
    async fn sign_up(&self, email: &str, password: &str, metadata: UserMetadata)
    -> Result<SignUp>;

    /// Revoke the session behind `access_token`
    async fn sign_out(&self, access_token: &str) -> Result<()>;

    /// Resolve the identity behind `access_token`
    async fn get_user(&self, access_token: &str) -> Result<AuthUser>;

    /// Rotate an expired session
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
