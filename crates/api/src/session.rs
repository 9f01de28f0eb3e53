//! Browser sessions
//!
//! Each browser is identified by the `folio_session` cookie and owns one
//! [`SessionManager`] (and through it one [`AuthClient`]). Sessions live in
//! the [`SessionRegistry`] until they sit idle past the configured timeout.
//!
//! [`AuthClient`]: folio_backend::AuthClient

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::Response;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use folio_auth::SessionManager;
use folio_backend::BackendClient;
use folio_control::{RequestContext, UserService};

use crate::state::AppState;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "folio_session";

/// Default idle time before a session is dropped
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct Entry {
    manager: Arc<SessionManager>,
    last_seen: Instant,
}

/// A browser session found in (or just added to) the registry
#[derive(Debug, Clone)]
pub struct ActiveSession {
    /// Cookie value
    pub id: String,
    pub manager: Arc<SessionManager>,
}

/// Live browser sessions keyed by cookie value
pub struct SessionRegistry {
    backend: BackendClient,
    users: UserService,
    idle_timeout: Duration,
    sessions: RwLock<HashMap<String, Entry>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new(backend: BackendClient, users: UserService, idle_timeout: Duration) -> Self {
        Self {
            backend,
            users,
            idle_timeout,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a session, refreshing its idle clock
    pub fn get(&self, id: &str) -> Option<ActiveSession> {
        let mut sessions = self.sessions.write();
        let entry = sessions.get_mut(id)?;
        entry.last_seen = Instant::now();

        Some(ActiveSession {
            id: id.to_string(),
            manager: Arc::clone(&entry.manager),
        })
    }

    /// Start a new, signed-out session
    ///
    /// Must be called from within a Tokio runtime.
    pub fn create(&self) -> ActiveSession {
        let id = uuid::Uuid::new_v4().to_string();
        let manager = Arc::new(SessionManager::start(
            Arc::new(self.backend.auth_client()),
            self.users.clone(),
        ));

        self.sessions.write().insert(
            id.clone(),
            Entry {
                manager: Arc::clone(&manager),
                last_seen: Instant::now(),
            },
        );
        debug!(session_id = %id, "Browser session created");

        ActiveSession { id, manager }
    }

    /// Drop a session; false if it was not registered
    pub fn remove(&self, id: &str) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Drop sessions idle longer than the timeout, returning how many went
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_timeout);
        before - sessions.len()
    }

    /// Start a background task that prunes idle sessions
    ///
    /// Returns a shutdown sender and the task handle. Send on (or drop) the
    /// sender to stop the task.
    pub fn start_cleanup_task(
        self: &Arc<Self>,
        interval: Duration,
    ) -> (watch::Sender<()>, tokio::task::JoinHandle<()>) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(());
        let registry = Arc::clone(self);

        let handle = tokio::spawn(async move {
            info!("Session cleanup task started (interval: {:?})", interval);

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        let pruned = registry.prune();
                        if pruned > 0 {
                            debug!(pruned, remaining = registry.len(), "Idle sessions pruned");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!("Session cleanup task shutting down");
                        break;
                    }
                }
            }
        });

        (shutdown_tx, handle)
    }
}

// =============================================================================
// Cookies
// =============================================================================

/// Session id from the `Cookie` header
pub fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value binding the browser to a session
pub fn session_cookie(id: &str, secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that expires the session cookie
pub fn expired_cookie(secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Append a `Set-Cookie` header to a response
pub(crate) fn set_cookie(mut response: Response, cookie: &str) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => warn!(error = %e, "Unencodable session cookie"),
    }
    response
}

// =============================================================================
// Extractors
// =============================================================================

/// The request's browser session, if its cookie names a live one
///
/// Never rejects: an unknown or missing cookie yields `None`.
#[derive(Debug, Clone)]
pub struct BrowserSession(pub Option<ActiveSession>);

impl FromRequestParts<AppState> for BrowserSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = session_id(&parts.headers).and_then(|id| state.sessions.get(id));
        Ok(Self(session))
    }
}

/// Client details of the request, stored alongside the rows it writes
#[derive(Debug, Clone, Default)]
pub struct ClientContext(pub RequestContext);

impl<S: Send + Sync> FromRequestParts<S> for ClientContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(RequestContext::from_headers(&parts.headers)))
    }
}
