//! Upstream generation providers.
//!
//! The relay talks to its upstream through [`TextProvider`] so handlers can
//! be exercised against a mock without network access.

pub mod gemini;
pub mod mock;

use crate::models::GenerateRequest;
use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// The upstream answered with an error object or a failure status.
    #[error("Upstream error: {message}")]
    Upstream {
        message: String,
        details: Option<String>,
    },

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Result of a generation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderResponse {
    /// Text of the first part of the first candidate, if any.
    pub text: Option<String>,

    /// Why the first candidate stopped (e.g. `STOP`, `SAFETY`).
    pub finish_reason: Option<String>,

    /// Set when the prompt itself was blocked.
    pub block_reason: Option<String>,

    /// Input tokens consumed.
    pub input_tokens: Option<i32>,

    /// Output tokens generated.
    pub output_tokens: Option<i32>,
}

/// Trait for text generation providers (e.g., Gemini).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Model identifier used for requests.
    fn model(&self) -> &str;

    /// Whether the provider holds the credential it needs.
    fn is_configured(&self) -> bool;

    /// Generate a response for a single prompt turn.
    async fn generate(&self, request: &GenerateRequest)
        -> Result<ProviderResponse, ProviderError>;
}
