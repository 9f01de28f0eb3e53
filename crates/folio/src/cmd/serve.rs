//! Serve command - Run the Folio server

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use folio_api::{AppState, RouterOptions, build_router_with_options};
use folio_backend::{BackendClient, HostedBackend, HostedConfig, MemoryBackend};
use folio_config::{BackendConfig, BackendMode, Config, NewsletterConfig};
use folio_mailing::{EmailOctopusClient, EmailOctopusConfig, MailingList};

/// How long in-flight requests get to finish after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the serve command
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config_label = config_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        config = %config_label,
        "Folio starting"
    );

    let config = load_config(config_path)?;

    if let Err(e) = run_server(config).await {
        error!(error = %e, "server error");
        return Err(e);
    }

    info!("Folio shutdown complete");
    Ok(())
}

/// Load configuration; an explicitly given path must exist
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path
        && !path.exists()
    {
        return Err(anyhow::anyhow!("config file not found: {}", path.display()));
    }

    Config::load(path).context("failed to load configuration")
}

/// Backend handle for the configured mode
pub(crate) fn build_backend(config: &BackendConfig) -> Result<BackendClient> {
    match config.mode {
        BackendMode::Hosted => {
            let url = config
                .url
                .as_deref()
                .context("backend.url is required in hosted mode")?;
            let anon_key = config
                .anon_key
                .as_deref()
                .context("backend.anon_key is required in hosted mode")?;

            let mut hosted = HostedConfig::new(url, anon_key);
            if let Some(service_key) = &config.service_key {
                hosted = hosted.with_service_key(service_key);
            }

            let backend = HostedBackend::new(hosted).context("failed to create backend client")?;
            info!(url, service_key = config.service_key.is_some(), "hosted backend configured");
            Ok(BackendClient::hosted(backend))
        }
        BackendMode::Memory => {
            warn!("in-memory backend: accounts and submissions are lost on restart");
            Ok(BackendClient::memory(Arc::new(MemoryBackend::new())))
        }
    }
}

/// Mailing list client, if an API key is configured
pub(crate) fn build_mailing(config: &NewsletterConfig) -> Result<Option<Arc<dyn MailingList>>> {
    let Some(api_key) = config.api_key() else {
        info!("newsletter forwarding disabled (no API key)");
        return Ok(None);
    };

    let mut settings = EmailOctopusConfig::new(api_key)
        .with_base_url(&config.base_url)
        .with_list_id(&config.list_id);
    settings.tags = config.tags.clone();

    let client = EmailOctopusClient::new(settings).context("failed to create mailing list client")?;
    info!(list_id = %config.list_id, "newsletter forwarding enabled");
    Ok(Some(Arc::new(client)))
}

/// Interval between idle-session sweeps
fn cleanup_interval(idle_timeout: Duration) -> Duration {
    (idle_timeout / 4).max(Duration::from_secs(1))
}

/// Main server run loop
async fn run_server(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();

    let backend = build_backend(&config.backend)?;
    let mut state = AppState::with_idle_timeout(backend, config.server.session_idle_timeout)
        .with_secure_cookies(config.server.cookie_secure);
    if let Some(mailing) = build_mailing(&config.newsletter)? {
        state = state.with_mailing(mailing);
    }

    let (cleanup_shutdown, cleanup_task) = state
        .sessions
        .start_cleanup_task(cleanup_interval(config.server.session_idle_timeout));

    let router_options = RouterOptions {
        audit_logging: config.server.audit_logging,
    };
    let app = build_router_with_options(state, router_options).layer(TraceLayer::new_for_http());

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        addr = %addr,
        backend = ?config.backend.mode,
        audit_logging = config.server.audit_logging,
        "Folio server listening"
    );

    let server_cancel = cancel.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                server_cancel.cancelled().await;
            })
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "HTTP server error");
            });
    });

    wait_for_shutdown().await;

    info!("shutdown signal received, stopping server...");
    cancel.cancel();
    let _ = cleanup_shutdown.send(());

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "server task panicked during shutdown"),
        Err(_) => warn!("server did not finish within timeout, continuing shutdown"),
    }

    if let Err(e) = cleanup_task.await {
        warn!(error = %e, "session cleanup task panicked");
    }

    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
