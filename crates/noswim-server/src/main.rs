//! # noswim-server
//!
//! Runs the no-swim zone monitor and serves its state over a local REST API.
//!
//! ## Running
//!
//! ```bash
//! # Development, static position
//! NOSWIM__LOCATION__PROVIDER=fixed \
//! NOSWIM__LOCATION__LATITUDE=37.9755 NOSWIM__LOCATION__LONGITUDE=23.7348 \
//!     cargo run --package noswim-server
//!
//! # Production, explicit config file
//! NOSWIM_CONFIG=/etc/noswim/config.toml ./noswim-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use noswim_core::{
    AnyLocationSource, DesktopShare, HttpComplianceClient, LogSink, MonitorSettings,
    NoSwimConfig, NoSwimError, PollingScheduler, StaticMapFetcher,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use noswim_server::api;
use noswim_server::logging;
use noswim_server::presenter::ConsolePresenter;
use noswim_server::state::AppState;

/// Environment variable naming an explicit config file.
const CONFIG_PATH_ENV: &str = "NOSWIM_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let config = NoSwimConfig::load(config_path.as_deref()).context("Failed to load config")?;

    logging::init(config.server.production)?;
    config.validate().context("Invalid configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        provider = ?config.location.provider,
        "Starting noswim-server"
    );

    let log = open_session_log(&config);
    log.write_session_header();

    let location = AnyLocationSource::from_config(&config.location)
        .context("Failed to configure location source")?;
    let compliance = HttpComplianceClient::new(config.compliance_url()?, config.request_timeout())?;
    let map = StaticMapFetcher::new(
        config.map_url()?,
        config.map.api_key.clone(),
        config.map.scale,
        config.map.map_type.clone(),
    )?;
    info!(
        provider = location.provider_name(),
        compliance = %compliance.base_url(),
        "Monitor collaborators ready"
    );

    let presenter = Arc::new(ConsolePresenter::new());
    let scheduler = PollingScheduler::new(
        location,
        compliance,
        map,
        Arc::clone(&presenter),
        log.clone(),
        MonitorSettings::from_config(&config),
    );

    let state = AppState::new(log, scheduler.subscribe(), presenter, Arc::new(DesktopShare));
    let app = api::create_router(state);

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let monitor = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match scheduler.run(cancel).await {
                Ok(cycles) => info!(cycles, "Monitor finished"),
                Err(NoSwimError::Cancelled) => info!("Monitor cancelled during startup"),
                Err(e) if e.is_startup_fatal() => {
                    error!(error = %e, "Monitor failed to start, API stays up");
                }
                Err(e) => error!(error = %e, "Monitor stopped with error"),
            }
        }
    });

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    info!("Listening on {}", config.server.bind_address);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    // The server can also stop on its own; make sure the monitor follows.
    cancel.cancel();
    if let Err(e) = monitor.await {
        warn!(error = %e, "Monitor task did not exit cleanly");
    }

    info!("noswim-server shut down");
    Ok(())
}

/// Opens the durable session log, falling back to a view-only log.
fn open_session_log(config: &NoSwimConfig) -> LogSink {
    let directory = config.log_directory();
    let ceiling = config.log.view_ceiling_chars;
    match LogSink::open(&directory, ceiling) {
        Ok(log) => log,
        Err(e) => {
            let e = NoSwimError::LogPersistence(e.to_string());
            error!(
                error = %e,
                directory = %directory.display(),
                "Could not create session log file, keeping log in memory only"
            );
            LogSink::view_only(ceiling)
        }
    }
}

/// Cancels `cancel` on SIGINT or SIGTERM.
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
        (Ok(mut sigint), Ok(mut sigterm)) => {
            tokio::select! {
                _ = sigint.recv() => info!("Received SIGINT, initiating shutdown..."),
                _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown..."),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Failed to install signal handlers, using Ctrl+C only");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating shutdown..."),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}
