//! The prompt relay endpoint.
//!
//! `POST /generate` runs a linear pipeline: origin check, body validation,
//! credential check, upstream call, text extraction.

use crate::error::RelayError;
use crate::handlers::cors::declared_origin;
use crate::models::{GenerateRequest, GenerateResponse};
use crate::services::metrics::record_generation;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};

/// Relay a prompt (and optional inline file) to the upstream model.
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<GenerateResponse>, RelayError> {
    let result = relay(&state, &headers, &body).await;

    record_generation(match &result {
        Ok(_) => "ok",
        Err(err) => err.kind(),
    });

    result.map(Json)
}

/// CORS preflight. The body is never read.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Any method other than POST or OPTIONS.
pub async fn method_not_allowed() -> RelayError {
    RelayError::MethodNotAllowed
}

async fn relay(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<GenerateResponse, RelayError> {
    let origin = declared_origin(headers);
    if state.origin_policy.check(&origin).is_denied() {
        tracing::warn!(origin = %origin, "Rejected request from unauthorized origin");
        return Err(RelayError::Unauthorized);
    }

    let request = GenerateRequest::from_json(body)?;

    if !state.text_provider.is_configured() {
        return Err(RelayError::Unconfigured);
    }

    tracing::info!(
        model = %state.text_provider.model(),
        prompt_len = request.prompt.len(),
        mime_type = request.file.as_ref().map(|f| f.mime_type.as_str()).unwrap_or("-"),
        "Relaying prompt to upstream"
    );

    let response = state.text_provider.generate(&request).await?;

    match response.text.filter(|text| !text.is_empty()) {
        Some(text) => {
            tracing::info!(
                text_len = text.len(),
                output_tokens = response.output_tokens.unwrap_or(0),
                "Generated response"
            );
            Ok(GenerateResponse { text })
        }
        None => Err(RelayError::BadRequest {
            message: "No response generated".to_string(),
            details: response.block_reason.or(response.finish_reason),
        }),
    }
}
