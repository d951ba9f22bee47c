use common::{TelemetryGuard, setup_logging};
use gateway::{GatewayConfig, router};
use inference::{Detector, backend::ort::OrtBackend};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env()?;

    let _telemetry = match config.otel_endpoint.as_deref() {
        Some(endpoint) => Some(TelemetryGuard::init("gateway", endpoint, config.environment)?),
        None => {
            setup_logging(config.environment);
            None
        }
    };

    tracing::info!(config = ?config, "Loaded configuration");

    let detector_config = Arc::new(config.detector_config()?);

    tracing::info!(
        path = %config.model_path,
        provider = ?config.execution_provider,
        "Loading inference model"
    );
    let backend =
        OrtBackend::load_model_with_provider(&config.model_path, config.execution_provider)?;
    let detector = Arc::new(Detector::new(backend, detector_config));

    let app = router(detector, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("HTTP server listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
