//! Server mode CLI logic
//!
//! Contains the core logic for running the HTTP server mode.

use crate::{
    config::{ConfigLoader, Settings},
    server::{AppState, BindAddress, create_app, serve},
    utils::version,
};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for server mode
#[derive(Debug, Default)]
pub struct ServerArgs {
    pub config: Option<PathBuf>,
    pub bind: Option<String>,
    pub verbose: bool,
}

/// Load and adjust settings for server mode
pub fn load_settings(args: &ServerArgs) -> Result<Settings> {
    let mut settings = ConfigLoader::new()
        .load(args.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(bind) = &args.bind {
        settings.server.bind = bind.clone();
    }
    if args.verbose {
        settings.logging.verbose = true;
    }

    Ok(settings)
}

/// Run server mode with the given arguments
pub async fn run_server_mode(args: ServerArgs) -> Result<()> {
    let settings = load_settings(&args)?;
    super::init_tracing(&settings.logging);

    tracing::info!("Starting QR check-in provider v{}", version::get_version());

    let settings = Arc::new(settings);
    let bind = BindAddress::parse(&settings.server.bind);
    let state = AppState::from_settings(settings)
        .await
        .context("Failed to initialize token pipeline")?;

    serve(create_app(state), &bind, shutdown_signal())
        .await
        .with_context(|| format!("Server on {} failed", bind))?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on SIGINT, SIGTERM, SIGHUP or SIGQUIT
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let kinds = [
        SignalKind::interrupt(),
        SignalKind::terminate(),
        SignalKind::hangup(),
        SignalKind::quit(),
    ];
    let mut streams = Vec::new();
    for kind in kinds {
        match signal(kind) {
            Ok(stream) => streams.push(stream),
            Err(e) => tracing::warn!("Cannot listen for signal {:?}: {}", kind, e),
        }
    }

    if streams.is_empty() {
        std::future::pending::<()>().await;
    }

    let waits = streams.iter_mut().map(|stream| Box::pin(stream.recv()));
    futures_util::future::select_all(waits).await;
    tracing::info!("Shutdown signal received");
}

/// Resolve on Ctrl-C
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
