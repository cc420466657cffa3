use relay_service::config::RelayConfig;
use relay_service::services::metrics::init_metrics;
use relay_service::startup::Application;
use service_core::error::AppError;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let config = RelayConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    init_metrics()?;

    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        "Starting prompt relay service"
    );

    let app = Application::build(config).await?;
    app.run_until_stopped().await.map_err(|e| {
        tracing::error!("HTTP server error: {}", e);
        AppError::from(e)
    })?;

    Ok(())
}
