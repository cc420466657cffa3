//! Error taxonomy of the relay endpoint.

use crate::services::providers::ProviderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use service_core::error::ErrorResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Unauthorized domain")]
    Unauthorized,

    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },

    #[error("API key not configured")]
    Unconfigured,

    #[error("{message}")]
    UpstreamError {
        message: String,
        details: Option<String>,
    },

    #[error("Upstream request timed out")]
    GatewayTimeout,

    #[error("Failed to generate response: {0}")]
    InternalError(anyhow::Error),
}

impl RelayError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        RelayError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request_with(message: impl Into<String>, details: impl Into<String>) -> Self {
        RelayError::BadRequest {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::Unauthorized => StatusCode::FORBIDDEN,
            RelayError::BadRequest { .. } | RelayError::UpstreamError { .. } => {
                StatusCode::BAD_REQUEST
            }
            RelayError::Unconfigured | RelayError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RelayError::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::MethodNotAllowed => "method_not_allowed",
            RelayError::Unauthorized => "unauthorized",
            RelayError::BadRequest { .. } => "bad_request",
            RelayError::Unconfigured => "unconfigured",
            RelayError::UpstreamError { .. } => "upstream_error",
            RelayError::GatewayTimeout => "timeout",
            RelayError::InternalError(_) => "internal_error",
        }
    }
}

impl From<ProviderError> for RelayError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(_) => RelayError::Unconfigured,
            ProviderError::Upstream { message, details } => {
                RelayError::UpstreamError { message, details }
            }
            ProviderError::Timeout => RelayError::GatewayTimeout,
            ProviderError::NetworkError(msg) => RelayError::InternalError(anyhow::anyhow!(msg)),
            ProviderError::Malformed(msg) => {
                RelayError::InternalError(anyhow::anyhow!("Malformed upstream response: {}", msg))
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Generate request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Generate request rejected");
        }

        let body = match self {
            RelayError::BadRequest { message, details }
            | RelayError::UpstreamError { message, details } => ErrorResponse::new(message, details),
            RelayError::InternalError(err) => {
                ErrorResponse::new("Failed to generate response", Some(err.to_string()))
            }
            other => ErrorResponse::new(other.to_string(), None),
        };

        body.into_response_with(status)
    }
}
