//! Configuration validation
//!
//! Checks that:
//! - Hosted mode has a well-formed URL and an anon key
//! - The server binds a real port and keeps sessions for a non-zero time
//! - Newsletter forwarding has a list to forward to

use crate::Config;
use crate::backend::BackendMode;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_backend(config)?;
    validate_newsletter(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        return Err(ConfigError::invalid_value("server", "port", "must be non-zero"));
    }
    if config.server.session_idle_timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            "server",
            "session_idle_timeout",
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_backend(config: &Config) -> Result<()> {
    let backend = &config.backend;
    if backend.mode != BackendMode::Hosted {
        return Ok(());
    }

    let url = non_empty(&backend.url).ok_or(ConfigError::missing_field("backend", "url"))?;
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ConfigError::invalid_value(
            "backend",
            "url",
            format!("'{url}' must start with http:// or https://"),
        ));
    }

    non_empty(&backend.anon_key).ok_or(ConfigError::missing_field("backend", "anon_key"))?;
    Ok(())
}

fn validate_newsletter(config: &Config) -> Result<()> {
    let newsletter = &config.newsletter;
    if newsletter.api_key().is_some() && newsletter.list_id.trim().is_empty() {
        return Err(ConfigError::missing_field("newsletter", "list_id"));
    }
    Ok(())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
