//! Auth session manager
//!
//! One manager per browser session. A single actor task owns the
//! [`SessionState`] and is its only writer: backend auth events, loading
//! changes and profile edits are applied one at a time, in arrival order,
//! and each published through a `watch` channel. Operations on the
//! [`SessionManager`] handle talk to the backend directly and never touch
//! the state themselves.

use std::sync::Arc;

use folio_backend::{AuthClient, AuthEvent, AuthSession, AuthUser, BackendError, UserMetadata};
use folio_control::{Activity, ProfileUpdate, RequestContext, UserProfile, UserService};
use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::error::{AuthError, Result};
use crate::state::{AuthOutcome, SessionState, SessionStatus};
use crate::user::SessionUser;

/// Returned on successful login
pub const LOGIN_SUCCESS: &str = "Login successful";
/// Returned when login fails without a provider message
pub const LOGIN_ERROR: &str = "An error occurred during login";
/// Returned on successful signup
pub const SIGNUP_SUCCESS: &str =
    "Account created successfully! Please check your email to verify your account.";
/// Returned when signup yields no user
pub const SIGNUP_FAILED: &str = "Signup failed";
/// Returned when signup fails without a provider message
pub const SIGNUP_ERROR: &str = "An error occurred during signup";

/// Messages to the actor
enum Command {
    LoadingStarted,
    LoadingFinished,
    ProfileUpdated {
        profile: UserProfile,
        applied: oneshot::Sender<bool>,
    },
    /// Apply every auth event emitted so far, then reply
    Settle { done: oneshot::Sender<()> },
}

/// Handle to a browser session's auth state
///
/// # Example
///
/// ```ignore
/// let manager = SessionManager::start(Arc::new(backend.auth_client()), users);
/// manager.ready().await?;
///
/// let outcome = manager.login("jane@example.com", "secret", None).await;
/// if outcome.success {
///     let state = manager.settled().await?;
///     assert!(state.is_authenticated());
/// }
/// ```
pub struct SessionManager {
    auth: Arc<AuthClient>,
    users: UserService,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl SessionManager {
    /// Spawn the actor and begin the initial session lookup
    ///
    /// Must be called from within a Tokio runtime. The actor stops once the
    /// handle is dropped.
    pub fn start(auth: Arc<AuthClient>, users: UserService) -> Self {
        let (state_tx, state_rx) = watch::channel(SessionState::initializing());
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        // Subscribe before the initial lookup so no change slips between them
        let events = auth.on_auth_state_change();

        let actor = SessionActor {
            auth: Arc::clone(&auth),
            users: users.clone(),
            state: state_tx,
            events,
            commands: commands_rx,
            in_flight: 0,
        };
        tokio::spawn(actor.run());

        Self {
            auth,
            users,
            commands: commands_tx,
            state: state_rx,
        }
    }

    /// The session's auth client
    pub fn auth(&self) -> &Arc<AuthClient> {
        &self.auth
    }

    /// Current state snapshot
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Current user, if signed in
    pub fn user(&self) -> Option<SessionUser> {
        self.state.borrow().user.clone()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Wait for the initial session lookup to finish
    pub async fn ready(&self) -> Result<SessionState> {
        let mut state = self.state.clone();
        let ready = state
            .wait_for(SessionState::is_ready)
            .await
            .map_err(|_| AuthError::Stopped)?;
        Ok(ready.clone())
    }

    /// Wait until every auth event emitted so far has been applied
    ///
    /// State changes caused by login and logout arrive through the event
    /// stream; this is the barrier for callers that need to observe them.
    pub async fn settled(&self) -> Result<SessionState> {
        let (done, waiting) = oneshot::channel();
        self.commands
            .send(Command::Settle { done })
            .map_err(|_| AuthError::Stopped)?;
        waiting.await.map_err(|_| AuthError::Stopped)?;
        Ok(self.state())
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Sign in with email and password
    ///
    /// Provider rejections come back with the provider's message. A
    /// successful login is recorded in the activity log.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        context: Option<&RequestContext>,
    ) -> AuthOutcome {
        let _loading = LoadingGuard::new(&self.commands);

        match self.auth.sign_in_with_password(email, password).await {
            Ok(session) => {
                self.users
                    .track_activity(&session.user.id, &Activity::Login, context)
                    .await;
                AuthOutcome::success(LOGIN_SUCCESS)
            }
            Err(e) => failure(e, LOGIN_ERROR),
        }
    }

    /// Register a new account
    ///
    /// The provider requires email confirmation, so a successful signup
    /// normally leaves the session signed out.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
        context: Option<&RequestContext>,
    ) -> AuthOutcome {
        let _loading = LoadingGuard::new(&self.commands);

        let mut metadata = UserMetadata::new();
        metadata.insert("full_name".to_string(), json!(name));

        match self.auth.sign_up(email, password, metadata).await {
            Ok(result) => match result.user {
                Some(user) => {
                    let activity = Activity::Signup {
                        name: name.to_string(),
                    };
                    self.users.track_activity(&user.id, &activity, context).await;
                    info!(user_id = %user.id, "Account created");
                    AuthOutcome::success(SIGNUP_SUCCESS)
                }
                None => AuthOutcome::failure(SIGNUP_FAILED),
            },
            Err(e) => failure(e, SIGNUP_ERROR),
        }
    }

    /// Sign out
    ///
    /// The state flips to unauthenticated when the resulting auth event is
    /// applied, not before this returns.
    pub async fn logout(&self, context: Option<&RequestContext>) {
        if let Some(user) = self.user() {
            self.users
                .track_activity(&user.id, &Activity::Logout, context)
                .await;
        }

        if let Err(e) = self.auth.sign_out().await {
            warn!(error = %e, "Sign-out failed");
        }
    }

    /// Edit the signed-in user's profile
    ///
    /// Returns false when signed out or when the update fails.
    pub async fn update_profile(
        &self,
        updates: &ProfileUpdate,
        context: Option<&RequestContext>,
    ) -> bool {
        let Some(user) = self.user() else {
            return false;
        };

        let Some(profile) = self.users.update_user_profile(&user.id, updates).await else {
            return false;
        };

        let (applied, waiting) = oneshot::channel();
        if self
            .commands
            .send(Command::ProfileUpdated { profile, applied })
            .is_ok()
            && !waiting.await.unwrap_or(false)
        {
            debug!(user_id = %user.id, "Session changed before profile update was applied");
        }

        let activity = Activity::ProfileUpdate(updates.clone());
        self.users.track_activity(&user.id, &activity, context).await;
        true
    }
}

/// Provider message verbatim, otherwise a generic one
fn failure(error: BackendError, fallback: &str) -> AuthOutcome {
    match error.auth_message() {
        Some(message) => {
            debug!(%message, "Auth request rejected");
            AuthOutcome::failure(message)
        }
        None => {
            warn!(error = %error, "Auth request failed");
            AuthOutcome::failure(fallback)
        }
    }
}

/// Counts an in-flight login/signup for `is_loading`
struct LoadingGuard<'a> {
    commands: &'a mpsc::UnboundedSender<Command>,
}

impl<'a> LoadingGuard<'a> {
    fn new(commands: &'a mpsc::UnboundedSender<Command>) -> Self {
        let _ = commands.send(Command::LoadingStarted);
        Self { commands }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::LoadingFinished);
    }
}

// =============================================================================
// Actor
// =============================================================================

struct SessionActor {
    auth: Arc<AuthClient>,
    users: UserService,
    state: watch::Sender<SessionState>,
    events: broadcast::Receiver<AuthEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    in_flight: usize,
}

impl SessionActor {
    async fn run(mut self) {
        self.resync().await;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                event = self.events.recv() => match event {
                    Ok(event) => {
                        debug!(change = ?event.change, "Auth event");
                        self.apply(event.session).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Auth events lagged, resyncing session");
                        self.resync().await;
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        debug!("Session manager stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::LoadingStarted => {
                self.in_flight += 1;
                self.publish(|_| {});
            }
            Command::LoadingFinished => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.publish(|_| {});
            }
            Command::ProfileUpdated { profile, applied } => {
                let mut merged = false;
                self.publish(|state| {
                    if let Some(user) = state.user.take_if(|user| user.id == profile.id) {
                        state.user = Some(user.with_profile(profile));
                        merged = true;
                    }
                });
                let _ = applied.send(merged);
            }
            Command::Settle { done } => {
                self.drain_events().await;
                let _ = done.send(());
            }
        }
    }

    async fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.apply(event.session).await,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Auth events lagged, resyncing session");
                    self.resync().await;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    /// Re-read the session from the auth client
    async fn resync(&mut self) {
        match self.auth.get_session().await {
            Ok(session) => self.apply(session).await,
            Err(e) => {
                warn!(error = %e, "Session lookup failed");
                self.leave_initializing();
            }
        }
    }

    /// Drive the state from a session (or its absence)
    async fn apply(&mut self, session: Option<AuthSession>) {
        let Some(session) = session else {
            self.publish(|state| {
                state.status = SessionStatus::Unauthenticated;
                state.user = None;
            });
            return;
        };

        match self.resolve(&session.user).await {
            Ok(user) => {
                debug!(user_id = %user.id, role = %user.role, "Session resolved");
                self.publish(|state| {
                    state.status = SessionStatus::Authenticated;
                    state.user = Some(user);
                });
            }
            Err(e) => {
                warn!(user_id = %session.user.id, error = %e, "Session resolution failed, keeping previous state");
                self.leave_initializing();
            }
        }
    }

    /// Build the session user, creating the profile on first sight
    ///
    /// A failed profile lookup does not fail resolution: the user is
    /// authenticated without a profile. Only a missing profile triggers a
    /// create, so a transient lookup error never duplicates one.
    async fn resolve(&self, auth_user: &AuthUser) -> Result<SessionUser> {
        let email = auth_user
            .email
            .as_deref()
            .filter(|email| !email.is_empty())
            .ok_or_else(|| AuthError::missing_email(&auth_user.id))?;

        let profile = match self.users.fetch_user_profile(&auth_user.id).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                self.users
                    .create_user_profile(&auth_user.id, email, auth_user.display_name())
                    .await
            }
            Err(e) => {
                warn!(user_id = %auth_user.id, error = %e, "Profile lookup failed, continuing without profile");
                None
            }
        };

        Ok(SessionUser::new(auth_user, email, profile))
    }

    fn leave_initializing(&self) {
        self.publish(|state| {
            if state.status == SessionStatus::Initializing {
                state.status = SessionStatus::Unauthenticated;
            }
        });
    }

    fn publish(&self, update: impl FnOnce(&mut SessionState)) {
        let in_flight = self.in_flight;
        self.state.send_modify(|state| {
            update(state);
            state.is_loading = state.status == SessionStatus::Initializing || in_flight > 0;
        });
    }
}
