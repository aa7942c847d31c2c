use std::sync::Arc;

use freeset_gateway::config::GatewayConfig;
use freeset_gateway::gateway::Gateway;
use freeset_gateway::types::ProviderKind;
use freeset_gateway::{GatewayError, server, telemetry};

#[tokio::main]
async fn main() {
    let _log_guard = match telemetry::init_from_env() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialise logging: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run().await {
        tracing::error!(error = %e, "gateway stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), GatewayError> {
    let config = GatewayConfig::from_env()?;
    for kind in ProviderKind::ALL {
        let settings = config.provider(kind);
        tracing::info!(
            kind = %kind,
            provider = %settings.provider_id,
            api_key = if settings.has_credentials() { "loaded" } else { "missing" },
            "provider configured"
        );
    }

    let bind_addr = config.bind_addr;
    let environment = config.environment.clone();
    let gateway = Arc::new(Gateway::new(config)?);
    let app = server::router(gateway);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| GatewayError::ConfigurationError(format!("Failed to bind {bind_addr}: {e}")))?;
    tracing::info!(addr = %bind_addr, environment = %environment, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GatewayError::InternalError(format!("Server error: {e}")))?;

    tracing::info!("gateway shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
