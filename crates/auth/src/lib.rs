//! Folio - Auth Session Manager
//!
//! Keeps the signed-in user of one browser session in sync with the
//! backend session.
//!
//! # Overview
//!
//! | Piece | Role |
//! |-------|------|
//! | [`SessionManager`] | Handle: login, signup, logout, profile edits, state reads |
//! | [`SessionState`] | Published snapshot: status, user, loading flag |
//! | [`SessionUser`] | Auth identity joined with its stored profile |
//!
//! # State flow
//!
//! ```text
//! AuthClient ──(AuthEvent)──► actor ──► resolve profile ──► watch<SessionState>
//! SessionManager ──(Command)──┘
//! ```
//!
//! Every event is fully resolved (profile fetched or created) before the
//! next one is looked at, so a slow resolution can never overwrite a newer
//! session with an older one.

mod error;
mod manager;
mod state;
mod user;


pub use error::{AuthError, Result};
pub use manager::{
    LOGIN_ERROR, LOGIN_SUCCESS, SIGNUP_ERROR, SIGNUP_FAILED, SIGNUP_SUCCESS, SessionManager,
};
pub use state::{AuthOutcome, SessionState, SessionStatus};
pub use user::SessionUser;
