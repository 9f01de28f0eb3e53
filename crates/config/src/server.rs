//! HTTP server configuration

use std::time::Duration;

use serde::Deserialize;

/// HTTP server configuration
///
/// # Example
///
/// ```toml
/// [server]
/// host = "0.0.0.0"                # default
/// port = 3000                     # default
/// audit_logging = false           # default
/// session_idle_timeout = "30m"    # default
/// cookie_secure = false           # default
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Log every request at target `audit`
    pub audit_logging: bool,

    /// Browser sessions unused for this long are dropped
    #[serde(with = "humantime_serde")]
    pub session_idle_timeout: Duration,

    /// Mark the session cookie `Secure` (serve over HTTPS only)
    pub cookie_secure: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            audit_logging: false,
            session_idle_timeout: Duration::from_secs(30 * 60),
            cookie_secure: false,
        }
    }
}

impl ServerConfig {
    /// `host:port` to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.session_idle_timeout, Duration::from_secs(1800));
        assert!(!config.audit_logging);
    }

    #[test]
    fn test_humantime_timeout() {
        let config: ServerConfig = toml::from_str("session_idle_timeout = \"2h\"").unwrap();
        assert_eq!(config.session_idle_timeout, Duration::from_secs(7200));
    }
}
