//! User service models
//!
//! Row shapes for the four tables the site writes to.

mod activity;
mod profile;
mod submission;

pub use activity::{Activity, ActivityKind, UserActivity};
pub use profile::{DEFAULT_ROLE, ProfileUpdate, UserProfile};
pub use submission::{ContactSubmission, NewsletterStatus, NewsletterSubscription};
