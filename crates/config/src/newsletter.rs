//! Newsletter forwarding configuration

use serde::Deserialize;

/// Default list for newsletter signups
pub const DEFAULT_LIST_ID: &str = "a4aa28f8-3ddd-11f0-944b-41222a104c52";

/// Default email list API root
pub const DEFAULT_BASE_URL: &str = "https://emailoctopus.com/api/1.6";

/// Third-party email list settings
///
/// Forwarding is off unless an API key is set here or in
/// `EMAILOCTOPUS_API_KEY`.
///
/// # Example
///
/// ```toml
/// [newsletter]
/// api_key = "eo_..."
/// list_id = "a4aa28f8-3ddd-11f0-944b-41222a104c52"
/// tags = ["portfolio-newsletter", "website-signup"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsletterConfig {
    pub api_key: Option<String>,
    pub list_id: String,
    pub base_url: String,
    pub tags: Vec<String>,
}

impl Default for NewsletterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            list_id: DEFAULT_LIST_ID.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            tags: vec![
                "portfolio-newsletter".to_string(),
                "website-signup".to_string(),
            ],
        }
    }
}

impl NewsletterConfig {
    /// The API key, when forwarding is enabled
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }
}
