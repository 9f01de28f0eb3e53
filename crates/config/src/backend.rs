//! Hosted backend configuration

use serde::Deserialize;

/// Which backend implementation to run against
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Hosted auth + row store over HTTPS
    Hosted,
    /// In-process store, data lost on restart (default)
    #[default]
    Memory,
}

/// Backend connection configuration
///
/// # Example
///
/// ```toml
/// [backend]
/// mode = "hosted"
/// url = "https://xyz.supabase.co"
/// anon_key = "eyJ..."
/// service_key = "eyJ..."   # optional, used for row writes
/// ```
///
/// `url`, `anon_key` and `service_key` can also come from
/// `FOLIO_BACKEND_URL`, `FOLIO_BACKEND_ANON_KEY` and
/// `FOLIO_BACKEND_SERVICE_KEY`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub mode: BackendMode,
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub service_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_memory() {
        let config: BackendConfig = toml::from_str("").unwrap();
        assert_eq!(config.mode, BackendMode::Memory);
        assert!(config.url.is_none());
    }

    #[test]
    fn test_hosted() {
        let config: BackendConfig =
            toml::from_str("mode = \"hosted\"\nurl = \"https://x.example\"\nanon_key = \"k\"")
                .unwrap();
        assert_eq!(config.mode, BackendMode::Hosted);
        assert_eq!(config.anon_key.as_deref(), Some("k"));
    }
}
