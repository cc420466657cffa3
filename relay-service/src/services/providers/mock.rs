//! Mock provider implementation for testing.

use super::{ProviderError, ProviderResponse, TextProvider};
use crate::models::GenerateRequest;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What the mock answers with.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Echo the prompt back as `Mock response for: <prompt>`.
    Echo,
    /// Return exactly this text (possibly empty).
    Text(String),
    /// Fail as if the upstream reported an error.
    UpstreamError(String),
    /// Fail as if the upstream timed out.
    Timeout,
}

/// Mock text provider for testing.
pub struct MockTextProvider {
    configured: bool,
    reply: MockReply,
    calls: AtomicUsize,
}

impl MockTextProvider {
    pub fn new(reply: MockReply) -> Self {
        Self {
            configured: true,
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider that behaves as if no API key were set.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            reply: MockReply::Echo,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `generate` calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn model(&self) -> &str {
        "mock-model"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.configured {
            return Err(ProviderError::NotConfigured(
                "Mock text provider not configured".to_string(),
            ));
        }

        let text = match &self.reply {
            MockReply::Echo => format!("Mock response for: {}", request.prompt),
            MockReply::Text(text) => text.clone(),
            MockReply::UpstreamError(message) => {
                return Err(ProviderError::Upstream {
                    message: message.clone(),
                    details: None,
                })
            }
            MockReply::Timeout => return Err(ProviderError::Timeout),
        };

        Ok(ProviderResponse {
            text: Some(text),
            finish_reason: Some("STOP".to_string()),
            input_tokens: Some(i32::try_from(request.prompt.len() / 4).unwrap_or(i32::MAX)),
            output_tokens: Some(10),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_reports_token_estimate() {
        let provider = MockTextProvider::new(MockReply::Echo);
        let request = GenerateRequest {
            prompt: "a".repeat(40),
            file: None,
        };

        let response = provider.generate(&request).await.unwrap();

        assert_eq!(response.input_tokens, Some(10));
        let expected = format!("Mock response for: {}", request.prompt);
        assert_eq!(response.text, Some(expected));
        assert_eq!(provider.calls(), 1);
    }
}
