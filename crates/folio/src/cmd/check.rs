//! Check command - Validate configuration and print a summary

use std::fmt::Write;
use std::path::Path;

use anyhow::Result;
use folio_config::{BackendMode, Config};

use super::serve::load_config;

/// Run the check command
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    let source = config_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    println!("Configuration OK: {source}");
    print!("{}", summary(&config));
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Human-readable summary of the effective configuration
fn summary(config: &Config) -> String {
    let mut out = String::new();
    let server = &config.server;

    let _ = writeln!(out, "  listen:          {}", server.bind_addr());
    let _ = writeln!(out, "  audit logging:   {}", yes_no(server.audit_logging));
    let _ = writeln!(out, "  secure cookies:  {}", yes_no(server.cookie_secure));
    let _ = writeln!(
        out,
        "  session idle:    {}s",
        server.session_idle_timeout.as_secs()
    );
    let _ = writeln!(
        out,
        "  log:             {} ({:?})",
        config.log.level.as_str(),
        config.log.format
    );

    match config.backend.mode {
        BackendMode::Hosted => {
            let _ = writeln!(
                out,
                "  backend:         hosted {} (service key: {})",
                config.backend.url.as_deref().unwrap_or("-"),
                yes_no(config.backend.service_key.is_some())
            );
        }
        BackendMode::Memory => {
            let _ = writeln!(out, "  backend:         memory (data lost on restart)");
        }
    }

    match config.newsletter.api_key() {
        Some(_) => {
            let _ = writeln!(
                out,
                "  newsletter:      list {} tags [{}]",
                config.newsletter.list_id,
                config.newsletter.tags.join(", ")
            );
        }
        None => {
            let _ = writeln!(out, "  newsletter:      disabled");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::str::FromStr;

    #[test]
    fn test_summary_defaults() {
        let text = summary(&Config::default());
        assert!(text.contains("listen:          0.0.0.0:3000"));
        assert!(text.contains("backend:         memory"));
        assert!(text.contains("newsletter:      disabled"));
        assert!(text.contains("session idle:    1800s"));
    }

    #[test]
    fn test_summary_hosted() {
        let config = Config::from_str(
            "[backend]\nmode = \"hosted\"\nurl = \"https://x.example\"\nanon_key = \"k\"\n\
             [newsletter]\napi_key = \"eo_1\"\ntags = [\"a\", \"b\"]",
        )
        .unwrap();
        let text = summary(&config);
        assert!(text.contains("hosted https://x.example (service key: no)"));
        assert!(text.contains("tags [a, b]"));
    }

    #[test]
    fn test_run_with_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 8080").unwrap();
        assert!(run(Some(file.path())).is_ok());
    }

    #[test]
    fn test_run_missing_file() {
        assert!(run(Some(Path::new("/nonexistent/folio.toml"))).is_err());
    }
}
