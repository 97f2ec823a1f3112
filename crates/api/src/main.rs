use std::sync::Arc;

use anyhow::Context;

use allocation_api::app::{build_app, services::build_services};
use allocation_api::config::ApiConfig;
use allocation_infra::StorageConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    allocation_observability::init();

    let api_config = ApiConfig::from_env().context("invalid API configuration")?;
    let storage_config = StorageConfig::from_env().context("invalid storage configuration")?;

    let services = Arc::new(
        build_services(&storage_config)
            .await
            .context("failed to initialise storage")?,
    );
    let app = build_app(services.clone());

    let listener = tokio::net::TcpListener::bind(api_config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", api_config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    services.shutdown().await;
    tracing::info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    tracing::info!("shutdown signal received");
}
