//! Metrics collection and Prometheus export.
//!
//! Initializes the metrics exporter and provides the /metrics endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use service_core::error::AppError;
use std::sync::OnceLock;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Call once at startup, before any
/// metrics are recorded.
pub fn init_metrics() -> Result<(), AppError> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("failed to install Prometheus recorder: {}", e))
    })?;

    METRICS_HANDLE.set(handle).map_err(|_| {
        AppError::InternalError(anyhow::anyhow!("metrics handle already initialized"))
    })
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

/// Count a finished relay call by outcome (`ok`, `bad_request`, `upstream_error`, ...).
pub fn record_generation(outcome: &'static str) {
    metrics::counter!("relay_generations_total", "outcome" => outcome).increment(1);
}
