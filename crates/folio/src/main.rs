//! Folio - Portfolio site backend
//!
//! # Usage
//!
//! ```bash
//! # Run the server (default)
//! folio
//! folio --config configs/folio.toml
//!
//! # Validate configuration without starting
//! folio check --config configs/folio.toml
//! ```

mod cmd;

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use folio_config::{Config, LogFormat};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Folio - Portfolio site backend
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the server
    Serve,

    /// Validate configuration and print a summary
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Check) => {
            // Check only prints to stdout
            cmd::check::run(cli.config.as_deref())
        }
        // No subcommand = run server (default behavior)
        Some(Command::Serve) | None => {
            let (level, format) = resolve_logging(cli.log_level.as_deref(), cli.config.as_deref());
            init_logging(&level, format)?;
            cmd::serve::run(cli.config.as_deref()).await
        }
    }
}

/// Resolve log level and format: CLI flag > config file > default "info"
fn resolve_logging(cli_level: Option<&str>, config_path: Option<&Path>) -> (String, LogFormat) {
    let config = config_path
        .filter(|path| path.exists())
        .and_then(|path| Config::from_file(path).ok());

    let format = config
        .as_ref()
        .map(|config| config.log.format)
        .unwrap_or_default();

    let level = match (cli_level, &config) {
        (Some(level), _) => level.to_string(),
        (None, Some(config)) => config.log.level.as_str().to_string(),
        (None, None) => "info".to_string(),
    };

    (level, format)
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_flag_wins() {
        let (level, format) = resolve_logging(Some("debug"), None);
        assert_eq!(level, "debug");
        assert_eq!(format, LogFormat::Console);
    }

    #[test]
    fn test_config_file_level_and_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[log]\nlevel = \"warn\"\nformat = \"json\"").unwrap();

        let (level, format) = resolve_logging(None, Some(file.path()));
        assert_eq!(level, "warn");
        assert_eq!(format, LogFormat::Json);

        let (level, _) = resolve_logging(Some("trace"), Some(file.path()));
        assert_eq!(level, "trace");
    }

    #[test]
    fn test_missing_file_defaults() {
        let (level, format) = resolve_logging(None, Some(Path::new("/nonexistent/folio.toml")));
        assert_eq!(level, "info");
        assert_eq!(format, LogFormat::Console);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["folio", "check", "--config", "x.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Check)));
        assert_eq!(cli.config.as_deref(), Some(Path::new("x.toml")));

        let cli = Cli::try_parse_from(["folio", "-l", "debug"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }
}
