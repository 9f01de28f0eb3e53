//! EmailOctopus list client
//!
//! Adds contacts to a single list. The response body is only read for
//! error reporting.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::{MailingError, Result};

/// Public API root
pub const DEFAULT_BASE_URL: &str = "https://emailoctopus.com/api/1.6";

/// List the site's newsletter signups go to
pub const DEFAULT_LIST_ID: &str = "a4aa28f8-3ddd-11f0-944b-41222a104c52";

/// Tags applied to every contact
pub const DEFAULT_TAGS: [&str; 2] = ["portfolio-newsletter", "website-signup"];

/// HTTP request timeout
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A person joining the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// An external email list
#[async_trait]
pub trait MailingList: Send + Sync {
    /// Add a subscriber
    async fn subscribe(&self, subscriber: &Subscriber) -> Result<()>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Settings for [`EmailOctopusClient`]
#[derive(Debug, Clone)]
pub struct EmailOctopusConfig {
    pub api_key: String,
    pub list_id: String,
    pub base_url: String,
    pub tags: Vec<String>,
}

impl EmailOctopusConfig {
    /// Default list and tags with the given key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            list_id: DEFAULT_LIST_ID.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Point at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a different list
    pub fn with_list_id(mut self, list_id: impl Into<String>) -> Self {
        self.list_id = list_id.into();
        self
    }
}

/// EmailOctopus contact API client
pub struct EmailOctopusClient {
    http: reqwest::Client,
    config: EmailOctopusConfig,
}

impl std::fmt::Debug for EmailOctopusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailOctopusClient")
            .field("list_id", &self.config.list_id)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

#[derive(Serialize)]
struct ContactRequest<'a> {
    api_key: &'a str,
    email_address: &'a str,
    fields: ContactFields<'a>,
    tags: &'a [String],
    status: &'static str,
}

#[derive(Serialize)]
struct ContactFields<'a> {
    #[serde(rename = "FirstName")]
    first_name: &'a str,
    #[serde(rename = "LastName")]
    last_name: &'a str,
}

impl EmailOctopusClient {
    /// Create a client
    pub fn new(config: EmailOctopusConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self { http, config })
    }

    fn contacts_url(&self) -> String {
        format!(
            "{}/lists/{}/contacts",
            self.config.base_url.trim_end_matches('/'),
            self.config.list_id
        )
    }
}

#[async_trait]
impl MailingList for EmailOctopusClient {
    async fn subscribe(&self, subscriber: &Subscriber) -> Result<()> {
        let body = ContactRequest {
            api_key: &self.config.api_key,
            email_address: &subscriber.email,
            fields: ContactFields {
                first_name: &subscriber.first_name,
                last_name: &subscriber.last_name,
            },
            tags: &self.config.tags,
            status: "SUBSCRIBED",
        };

        let response = self
            .http
            .post(self.contacts_url())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailingError::Server {
                status: status.as_u16(),
                body,
            });
        }

        debug!(list_id = %self.config.list_id, "Contact added to mailing list");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "emailoctopus"
    }
}
