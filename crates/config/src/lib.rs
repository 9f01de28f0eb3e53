//! Folio Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a valid config: in-memory backend, port 3000.
//!
//! # Parsing
//!
//! ```
//! use folio_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[server]\nport = 8080").unwrap();
//! assert_eq!(config.server.port, 8080);
//! ```
//!
//! # Sections
//!
//! | Section | Purpose |
//! |---------|---------|
//! | `[log]` | Level and output format |
//! | `[server]` | Bind address, audit logging, browser-session lifetime |
//! | `[backend]` | Hosted backend URL and keys, or in-memory mode |
//! | `[newsletter]` | Third-party email list forwarding |
//!
//! # Environment
//!
//! [`Config::load`] applies these after reading the file:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `FOLIO_BACKEND_URL` | `backend.url` |
//! | `FOLIO_BACKEND_ANON_KEY` | `backend.anon_key` |
//! | `FOLIO_BACKEND_SERVICE_KEY` | `backend.service_key` |
//! | `EMAILOCTOPUS_API_KEY` | `newsletter.api_key` |

mod backend;
mod error;
mod logging;
mod newsletter;
mod server;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use backend::{BackendConfig, BackendMode};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use newsletter::{DEFAULT_BASE_URL, DEFAULT_LIST_ID, NewsletterConfig};
pub use server::ServerConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// HTTP server
    pub server: ServerConfig,

    /// Hosted backend connection
    pub backend: BackendConfig,

    /// Newsletter forwarding
    pub newsletter: NewsletterConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::read(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an optional file, then apply environment overrides
    ///
    /// Without a file every section takes its defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = lookup("FOLIO_BACKEND_URL") {
            self.backend.url = Some(url);
        }
        if let Some(key) = lookup("FOLIO_BACKEND_ANON_KEY") {
            self.backend.anon_key = Some(key);
        }
        if let Some(key) = lookup("FOLIO_BACKEND_SERVICE_KEY") {
            self.backend.service_key = Some(key);
        }
        if let Some(key) = lookup("EMAILOCTOPUS_API_KEY") {
            self.newsletter.api_key = Some(key);
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Ok(toml::from_str(&contents)?)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
