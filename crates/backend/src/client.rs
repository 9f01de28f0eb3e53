//! Backend handle and per-session auth client

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::hosted::HostedBackend;
use crate::memory::MemoryBackend;
use crate::provider::AuthProvider;
use crate::rows::RowStore;
use crate::types::{AuthChange, AuthEvent, AuthSession, SignUp, UserMetadata};

/// Auth events buffered per subscriber before it starts lagging
const EVENT_BUFFER: usize = 32;

/// Shared handle to the hosted backend
///
/// Cheap to clone. The auth provider and row store are shared by every
/// browser session; each session gets its own [`AuthClient`].
#[derive(Clone)]
pub struct BackendClient {
    auth: Arc<dyn AuthProvider>,
    rows: Arc<dyn RowStore>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("auth", &self.auth.name())
            .field("rows", &self.rows.name())
            .finish()
    }
}

impl BackendClient {
    /// Create a handle from separate auth and row implementations
    pub fn new(auth: Arc<dyn AuthProvider>, rows: Arc<dyn RowStore>) -> Self {
        Self { auth, rows }
    }

    /// Handle backed by the hosted service for both subsystems
    pub fn hosted(backend: HostedBackend) -> Self {
        let backend = Arc::new(backend);
        Self::new(
            Arc::clone(&backend) as Arc<dyn AuthProvider>,
            backend as Arc<dyn RowStore>,
        )
    }

    /// Handle backed by an in-process backend
    pub fn memory(backend: Arc<MemoryBackend>) -> Self {
        Self::new(
            Arc::clone(&backend) as Arc<dyn AuthProvider>,
            backend as Arc<dyn RowStore>,
        )
    }

    /// Stateless auth subsystem
    pub fn auth(&self) -> &Arc<dyn AuthProvider> {
        &self.auth
    }

    /// Row-store subsystem
    pub fn rows(&self) -> &Arc<dyn RowStore> {
        &self.rows
    }

    /// Create a fresh, signed-out auth client for one browser session
    pub fn auth_client(&self) -> AuthClient {
        AuthClient::new(Arc::clone(&self.auth))
    }
}

/// Stateful auth client for a single browser session
///
/// Holds the current session and broadcasts an [`AuthEvent`] for every
/// change. The session is swapped and the event sent under one lock, so
/// subscribers observe changes in the order they were applied.
pub struct AuthClient {
    provider: Arc<dyn AuthProvider>,
    session: RwLock<Option<AuthSession>>,
    events: broadcast::Sender<AuthEvent>,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("provider", &self.provider.name())
            .field("signed_in", &self.session.read().is_some())
            .finish()
    }
}

impl AuthClient {
    /// Create a signed-out client
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            provider,
            session: RwLock::new(None),
            events,
        }
    }

    /// Subscribe to auth-state changes
    ///
    /// Events sent before the call are not replayed; call [`get_session`]
    /// after subscribing to learn the starting state.
    ///
    /// [`get_session`]: AuthClient::get_session
    pub fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Current session, rotated first if it has expired
    ///
    /// A session that cannot be refreshed is dropped and `SignedOut` is
    /// emitted.
    pub async fn get_session(&self) -> Result<Option<AuthSession>> {
        let current = self.session.read().clone();
        let Some(session) = current else {
            return Ok(None);
        };

        if !session.is_expired() {
            return Ok(Some(session));
        }

        match self.provider.refresh_session(&session.refresh_token).await {
            Ok(refreshed) => {
                debug!(user_id = %refreshed.user.id, "Session refreshed");
                self.replace(Some(refreshed.clone()), AuthChange::TokenRefreshed);
                Ok(Some(refreshed))
            }
            Err(e) => {
                warn!(user_id = %session.user.id, error = %e, "Session refresh failed, signing out");
                self.replace(None, AuthChange::SignedOut);
                Ok(None)
            }
        }
    }

    /// Sign in and store the session
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        let session = self.provider.sign_in_with_password(email, password).await?;

        info!(user_id = %session.user.id, "User signed in");
        self.replace(Some(session.clone()), AuthChange::SignedIn);
        Ok(session)
    }

    /// Register a new identity
    ///
    /// The client only becomes signed in when the provider returns a session
    /// straight away (email confirmation disabled).
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<SignUp> {
        let result = self.provider.sign_up(email, password, metadata).await?;

        if let Some(session) = &result.session {
            info!(user_id = %session.user.id, "User signed up and signed in");
            self.replace(Some(session.clone()), AuthChange::SignedIn);
        }

        Ok(result)
    }

    /// Sign out
    ///
    /// The local session is cleared and `SignedOut` emitted before the remote
    /// revocation, so a failing backend never leaves the client signed in.
    pub async fn sign_out(&self) -> Result<()> {
        let previous = self.session.read().clone();
        self.replace(None, AuthChange::SignedOut);

        if let Some(session) = previous {
            self.provider.sign_out(&session.access_token).await?;
            info!(user_id = %session.user.id, "User signed out");
        }

        Ok(())
    }

    fn replace(&self, session: Option<AuthSession>, change: AuthChange) {
        let mut current = self.session.write();
        *current = session.clone();
        // No subscribers is fine
        let _ = self.events.send(AuthEvent { change, session });
    }
}
