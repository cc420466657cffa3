#![allow(dead_code)]

use relay_service::config::{
    Environment, GeminiSettings, GenerationSettings, RelayConfig, SecuritySettings,
};
use relay_service::startup::Application;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_API_KEY: &str = "test-api-key";
pub const TEST_MODEL: &str = "gemini-1.5-flash";
pub const ALLOWED_ORIGIN: &str = "https://app.dialogedu.com";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    /// Stand-in for the Gemini API.
    pub upstream: MockServer,
}

/// Relay configuration pointing at the given upstream mock.
pub fn test_config(upstream_uri: &str) -> RelayConfig {
    RelayConfig {
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port for testing
        },
        environment: Environment::Test,
        service_name: "relay-service".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        gemini: GeminiSettings {
            api_key: Some(Secret::new(TEST_API_KEY.to_string())),
            api_base_url: format!("{}/v1beta", upstream_uri),
            model: TEST_MODEL.to_string(),
            request_timeout: Duration::from_secs(5),
        },
        generation: GenerationSettings::default(),
        security: SecuritySettings::default(),
        max_request_bytes: 1024 * 1024,
    }
}

/// Path the relay posts to on the upstream.
pub fn upstream_path() -> String {
    format!("/v1beta/models/{}:generateContent", TEST_MODEL)
}

/// Upstream body carrying a single text candidate.
pub fn candidate(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 5, "candidatesTokenCount": 1 }
    })
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut RelayConfig)) -> Self {
        let upstream = MockServer::start().await;

        let mut config = test_config(&upstream.uri());
        configure(&mut config);

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
            upstream,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Mount an upstream reply for the generate call.
    pub async fn mock_upstream(&self, template: ResponseTemplate, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path(upstream_path()))
            .and(query_param("key", TEST_API_KEY))
            .respond_with(template)
            .expect(expected_calls)
            .mount(&self.upstream)
            .await;
    }

    /// POST a JSON body to `/generate` with an optional `Origin` header.
    pub async fn post_generate(&self, origin: Option<&str>, body: &Value) -> reqwest::Response {
        let mut request = self.client.post(self.url("/generate")).json(body);
        if let Some(origin) = origin {
            request = request.header("Origin", origin);
        }
        request.send().await.expect("Failed to send request")
    }

    /// Bodies of every request the upstream received.
    pub async fn upstream_bodies(&self) -> Vec<Value> {
        self.upstream
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| request.body_json::<Value>().expect("upstream body is JSON"))
            .collect()
    }
}
