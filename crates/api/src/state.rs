//! Application state
//!
//! Shared state for API handlers: the backend handle, the user service built
//! on its row store, live browser sessions and the optional mailing list.

use std::sync::Arc;
use std::time::Duration;

use folio_backend::BackendClient;
use folio_control::UserService;
use folio_mailing::MailingList;

use crate::session::{DEFAULT_IDLE_TIMEOUT, SessionRegistry};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Auth provider and row store
    pub backend: BackendClient,
    /// Profiles, activity log and lead capture
    pub users: UserService,
    /// Browser sessions keyed by cookie
    pub sessions: Arc<SessionRegistry>,
    /// External list newsletter subscribers are forwarded to
    pub mailing: Option<Arc<dyn MailingList>>,
    /// Mark the session cookie `Secure`
    pub cookie_secure: bool,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.backend)
            .field("sessions", &self.sessions.len())
            .field("mailing", &self.mailing.as_ref().map(|m| m.name()))
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

impl AppState {
    /// Create state with the default session idle timeout and no mailing list
    pub fn new(backend: BackendClient) -> Self {
        Self::with_idle_timeout(backend, DEFAULT_IDLE_TIMEOUT)
    }

    /// Create state whose sessions expire after `idle_timeout`
    pub fn with_idle_timeout(backend: BackendClient, idle_timeout: Duration) -> Self {
        let users = UserService::new(Arc::clone(backend.rows()));
        let sessions = Arc::new(SessionRegistry::new(
            backend.clone(),
            users.clone(),
            idle_timeout,
        ));

        Self {
            backend,
            users,
            sessions,
            mailing: None,
            cookie_secure: false,
        }
    }

    /// Forward newsletter subscribers to an external list
    pub fn with_mailing(mut self, mailing: Arc<dyn MailingList>) -> Self {
        self.mailing = Some(mailing);
        self
    }

    /// Mark the session cookie `Secure` (serve over HTTPS only)
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }
}
