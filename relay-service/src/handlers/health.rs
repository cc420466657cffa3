use crate::AppState;
use axum::{extract::State, http::Uri, response::IntoResponse, Json};
use serde_json::{json, Value};
use service_core::error::AppError;

/// Liveness probe.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe: the service can only relay once the upstream key is set.
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    if !state.text_provider.is_configured() {
        return Err(AppError::ServiceUnavailable(
            "API key not configured".to_string(),
        ));
    }

    Ok(Json(json!({
        "status": "ready",
        "model": state.text_provider.model()
    })))
}

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(anyhow::anyhow!("No route for {}", uri.path()))
}
