//! Operation Watch
//!
//! Single-binary tool that:
//! 1. Loads identity and API settings (secrets from env or files)
//! 2. Obtains an access token from the identity provider
//! 3. Waits on one remote operation, optionally under a resource lock
//! 4. Prints the terminal operation snapshot as JSON on stdout

mod cli;
mod config;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cloud_auth::CredentialStore;
use task_api::HttpTaskApi;
use task_tracker::{KeyedLock, PollError, Poller, Tracker};

use crate::cli::Args;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    // Only install the recorder when someone will read it
    let prometheus = args.metrics_file.as_ref().map(|_| metrics::install_recorder());

    let config_path = Config::resolve_path(args.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        identity_endpoint = %config.identity.endpoint,
        api_base_url = %config.api.base_url,
        interval_secs = config.polling.interval_secs,
        "configuration loaded"
    );

    let http_client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("failed to build HTTP client")?;

    let credentials = Arc::new(CredentialStore::new(
        config.credential_settings(),
        http_client.clone(),
    ));
    credentials
        .settings()
        .grant()
        .context("invalid identity configuration")?;

    let api = Arc::new(HttpTaskApi::new(
        http_client,
        config.api.base_url.clone(),
        credentials.clone(),
        config.request_timeout(),
    ));
    let poller = Poller::new(credentials.clone())
        .with_limits(config.poll_limits())
        .with_interval(config.poll_interval());
    let tracker = Tracker::new(api, credentials, Arc::new(KeyedLock::new())).with_poller(poller);

    let timeout = config.timeouts().for_kind(args.kind);
    let context = format!("error while waiting for {} operation", args.kind);

    info!(
        operation_id = %args.operation_id,
        kind = %args.kind,
        lock_key = args.lock_key.as_deref(),
        timeout_secs = timeout.as_secs(),
        "tracking operation"
    );

    let started = Instant::now();
    let outcome = tokio::select! {
        outcome = tracker.track(args.lock_key.as_deref(), &args.operation_id, &context, timeout) => outcome,
        _ = shutdown_signal() => {
            anyhow::bail!("interrupted before operation {} reached a terminal state", args.operation_id);
        }
    };
    metrics::record_wait(args.kind.as_str(), outcome_label(&outcome), started.elapsed());

    if let (Some(path), Some(handle)) = (args.metrics_file.as_ref(), prometheus.as_ref()) {
        std::fs::write(path, handle.render())
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    }

    match outcome {
        Ok(state) => {
            info!(operation_id = %args.operation_id, status = %state.status, "operation finished");
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
        Err(e) => {
            error!(operation_id = %args.operation_id, error = %e, "operation did not finish");
            Err(e).context(format!("operation {} did not finish", args.operation_id))
        }
    }
}

fn outcome_label(outcome: &task_tracker::Result<task_api::OperationState>) -> &'static str {
    match outcome {
        Ok(_) => "finished",
        Err(PollError::Timeout(_)) => "timeout",
        Err(PollError::Auth(_) | PollError::ReauthLoop(_)) => "auth",
        Err(PollError::OperationFailed { .. }) => "failed",
        Err(_) => "error",
    }
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM. A handler that fails to install
/// never resolves, so tracking continues uninterrupted.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
