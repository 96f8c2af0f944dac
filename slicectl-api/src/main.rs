use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use slicectl_core::config::Settings;
use slicectl_placement::PlacementEngine;
use slicectl_remote::executor::SshCredential;
use slicectl_remote::{MonitoringAdapter, MonitoringTunnel, RemoteExecutor};

use slicectl_api::rest::routes::create_router;
use slicectl_api::state::AppState;
use slicectl_api::store::SqliteStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Settings::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(listen = %settings.listen, workers = settings.worker_count(), "starting slicectl-api");

    let store: Arc<dyn slicectl_api::store::Store> = Arc::new(SqliteStore::connect(&settings.database_url).await?);

    let credential = match &settings.ssh_key_path {
        Some(path) => SshCredential::KeyFile(path.into()),
        None => SshCredential::Password(settings.ssh_password.clone().unwrap_or_default()),
    };
    let executor = RemoteExecutor::new(settings.gateway_host, settings.ssh_user.clone(), credential.clone());

    let placement = Arc::new(PlacementEngine::new(rand::random()));

    let tunnel_and_monitor = if settings.dev {
        info!("--dev set, skipping monitoring tunnel");
        None
    } else {
        let gateway: std::net::SocketAddr = settings.monitoring_tunnel.parse().map_err(|e| {
            format!("invalid --monitoring-tunnel address {}: {e}", settings.monitoring_tunnel)
        })?;
        let tunnel = MonitoringTunnel::open(gateway, &settings.ssh_user, &credential, "127.0.0.1", settings.monitoring_remote_port)
            .map_err(|e| format!("failed to open monitoring tunnel: {e}"))?;
        let monitor = MonitoringAdapter::new(tunnel.local_port(), settings.power_idle_default, settings.power_max_default);
        Some((tunnel, Arc::new(monitor)))
    };

    let monitor = tunnel_and_monitor.as_ref().map(|(_, m)| m.clone());
    let settings = Arc::new(settings);

    let app_state = AppState::new(store, settings.clone(), executor, placement, monitor);
    let router = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&settings.listen).await?;
    info!(listen = %settings.listen, "HTTP API listening");

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await
    });

    let ctrl_c = signal::ctrl_c();
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }

    let _ = shutdown_tx.send(true);
    match server_handle.await {
        Ok(Err(e)) => warn!(error = %e, "HTTP server exited with an error"),
        Err(e) => warn!(error = %e, "server task panicked during shutdown"),
        Ok(Ok(())) => {}
    }

    if let Some((tunnel, _)) = tunnel_and_monitor {
        tunnel.close();
    }

    info!("shutdown complete");
    Ok(())
}
