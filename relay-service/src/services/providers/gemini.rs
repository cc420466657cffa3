//! Gemini AI provider implementation.
//!
//! Sends a single-turn `generateContent` request and extracts the text of
//! the first candidate.

use super::{ProviderError, ProviderResponse, TextProvider};
use crate::config::{GeminiSettings, GenerationSettings};
use crate::models::GenerateRequest;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Message used when the upstream error object carries none.
const DEFAULT_UPSTREAM_ERROR: &str = "Gemini API error";

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<Secret<String>>,
    pub api_base_url: String,
    pub model: String,
    pub request_timeout: Duration,
    pub generation: GenerationSettings,
}

impl GeminiConfig {
    pub fn new(settings: &GeminiSettings, generation: GenerationSettings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            api_base_url: settings.api_base_url.clone(),
            model: settings.model.clone(),
            request_timeout: settings.request_timeout,
            generation,
        }
    }
}

/// Gemini text provider.
pub struct GeminiTextProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiTextProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Build the API URL for the given method. The key travels as a query
    /// parameter and is added per request.
    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.model,
            method
        )
    }
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_configured(&self) -> bool {
        self.config
            .api_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().is_empty())
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().is_empty())
            .ok_or_else(|| {
                ProviderError::NotConfigured("Gemini API key not configured".to_string())
            })?;

        let payload = build_request(request, &self.config.generation);
        let url = self.api_url("generateContent");

        tracing::debug!(
            model = %self.config.model,
            prompt_len = request.prompt.len(),
            has_file = request.file.is_some(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key.expose_secret().as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        let result = interpret_response(status, &body);
        if let Ok(parsed) = &result {
            tracing::debug!(
                status = %status,
                finish_reason = parsed.finish_reason.as_deref().unwrap_or("-"),
                input_tokens = parsed.input_tokens.unwrap_or(0),
                output_tokens = parsed.output_tokens.unwrap_or(0),
                "Gemini API responded"
            );
        }
        result
    }
}

/// Map a reqwest failure, dropping the URL so the key never reaches logs.
fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::NetworkError(err.without_url().to_string())
    }
}

/// Build the single-turn payload: inline data first (if any), then the prompt.
pub fn build_request(
    request: &GenerateRequest,
    generation: &GenerationSettings,
) -> GenerateContentRequest {
    let mut parts = Vec::with_capacity(2);

    if let Some(file) = &request.file {
        parts.push(ContentPart::InlineData {
            inline_data: InlineData {
                mime_type: file.mime_type.clone(),
                data: file.data.clone(),
            },
        });
    }

    parts.push(ContentPart::Text {
        text: request.prompt.clone(),
    });

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GenerationConfig {
            temperature: generation.temperature,
            max_output_tokens: generation.max_output_tokens,
        },
    }
}

/// Turn an upstream status and body into a provider result.
///
/// An `error` object in the body wins over the status code; a failure status
/// without one is still reported as an upstream error.
fn interpret_response(status: StatusCode, body: &str) -> Result<ProviderResponse, ProviderError> {
    let parsed: GenerateContentResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(_) if !status.is_success() => {
            return Err(ProviderError::Upstream {
                message: DEFAULT_UPSTREAM_ERROR.to_string(),
                details: Some(status.to_string()),
            })
        }
        Err(e) => return Err(ProviderError::Malformed(e.to_string())),
    };

    if let Some(error) = parsed.error {
        return Err(ProviderError::Upstream {
            message: error
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_UPSTREAM_ERROR.to_string()),
            details: error.status.or_else(|| error.code.map(|c| c.to_string())),
        });
    }

    if !status.is_success() {
        return Err(ProviderError::Upstream {
            message: DEFAULT_UPSTREAM_ERROR.to_string(),
            details: Some(status.to_string()),
        });
    }

    let first = parsed.candidates.into_iter().next();
    let finish_reason = first.as_ref().and_then(|c| c.finish_reason.clone());
    let text = first
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text);
    let usage = parsed.usage_metadata.unwrap_or_default();

    Ok(ProviderResponse {
        text,
        finish_reason,
        block_reason: parsed.prompt_feedback.and_then(|f| f.block_reason),
        input_tokens: usage.prompt_token_count,
        output_tokens: usage.candidates_token_count,
    })
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ContentPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize, PartialEq)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}
