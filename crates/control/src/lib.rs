//! Folio User Service
//!
//! Typed access to the rows the site owns, on top of the backend row store.
//!
//! # Tables
//!
//! | Table | Written by | Shape |
//! |-------|------------|-------|
//! | `user_profiles` | session resolution, profile edits | [`UserProfile`] |
//! | `user_activities` | every tracked action (append-only) | [`UserActivity`] |
//! | `contact_submissions` | contact action (append-only) | [`ContactSubmission`] |
//! | `newsletter_subscriptions` | newsletter action (upsert by email) | [`NewsletterSubscription`] |
//!
//! # Usage
//!
//! ```ignore
//! use folio_control::{Activity, RequestContext, UserService};
//!
//! let users = UserService::new(backend.rows().clone());
//! let profile = users.get_user_profile(&user_id).await;
//! users.track_activity(&user_id, &Activity::Login, Some(&ctx)).await;
//! ```
//!
//! Operations never return errors: failures are logged and surface as
//! `None`, `false` or an empty list. [`UserService::fetch_user_profile`] is
//! the one exception, for callers that must tell a missing profile apart
//! from a failed lookup.

pub mod context;
pub mod error;
pub mod models;
pub mod service;


pub use context::RequestContext;
pub use error::{ControlError, Result};
pub use models::{
    Activity, ActivityKind, ContactSubmission, DEFAULT_ROLE, NewsletterStatus,
    NewsletterSubscription, ProfileUpdate, UserActivity, UserProfile,
};
pub use service::{
    ACTIVITIES_TABLE, CONTACT_TABLE, DEFAULT_ACTIVITY_LIMIT, NEWSLETTER_TABLE, PROFILES_TABLE,
    UserService,
};
