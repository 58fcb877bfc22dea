mod api;
mod config;
mod device;
mod mirror;
mod poller;
mod snapshot;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{
    config::Config, device::DeviceClient, mirror::Mirror, poller::PollerService,
    snapshot::SnapshotStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent; env vars may be set externally)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    // Single shared snapshot; the mirror file only backs cold-start reads.
    let mirror = Mirror::new(&config.mirror_path);
    if let Err(e) = mirror.load().await {
        warn!(
            path = %mirror.path().display(),
            error = %e,
            "No usable mirror file; /api will fail until the first poll succeeds"
        );
    }
    let store = SnapshotStore::new(mirror);

    let device = DeviceClient::new(&config.device_url, config.fetch_timeout())
        .context("failed to build device HTTP client")?;

    // Spawn sensor-polling task
    tokio::spawn(PollerService::new(device, store.clone(), config.poll_interval()).run());

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "HTTP server listening");
    info!("Endpoints: GET /get (raw snapshot), GET /api (with mirror fallback), GET /health");

    axum::serve(listener, api::router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
