//! Folio - Mailing list
//!
//! Best-effort forwarding of newsletter signups to a third-party email
//! list. Callers treat every error here as non-fatal.

mod client;
mod error;

pub use client::{
    DEFAULT_BASE_URL, DEFAULT_LIST_ID, DEFAULT_TAGS, EmailOctopusClient, EmailOctopusConfig,
    MailingList, Subscriber,
};
pub use error::{MailingError, Result};
