use std::net::SocketAddr;

use deployment::{Deployment, DeploymentError};
use server::{DeploymentImpl, routes};
use services::services::{
    config::{AppConfig, ConfigError},
    telemetry::{TelemetryError, init_tracing},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendKitError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
}

#[tokio::main]
async fn main() -> Result<(), BackendKitError> {
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;
    let _tracing = init_tracing(&config)?;
    tracing::info!(app = %config.app_name, env = %config.app_env, "Starting");

    let deployment = DeploymentImpl::new(config.clone()).await?;

    if config.metrics.enabled {
        let exporter = routes::metrics::router(deployment.metrics().clone());
        let listener =
            tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.metrics.exporter_port))
                .await?;
        let port = listener.local_addr()?.port();
        tracing::info!("Metrics exporter on {}", config.service_url(port, "/metrics"));
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, exporter).await {
                tracing::error!("Metrics exporter stopped: {}", e);
            }
        });
    }

    let app_router = routes::router(deployment);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    let actual_port = listener.local_addr()?.port();
    tracing::info!("Server running on {}", config.service_url(actual_port, ""));

    axum::serve(
        listener,
        app_router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler we keep serving until the process is killed.
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
