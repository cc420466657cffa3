mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use relay_service::services::providers::mock::{MockReply, MockTextProvider};
use relay_service::services::OriginPolicy;
use relay_service::startup::build_router;
use relay_service::AppState;
use common::TestApp;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn test_health_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "relay-service");
}

#[tokio::test]
async fn test_ready_reports_model_when_configured() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/ready"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
    assert_eq!(body["model"], common::TEST_MODEL);
}

#[tokio::test]
async fn test_ready_fails_without_api_key() {
    let app = TestApp::spawn_with(|config| config.gemini.api_key = None).await;

    let response = app
        .client
        .get(app.url("/ready"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 503);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["details"], "API key not configured");
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/nope"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/health"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .expect("Failed to execute request");

    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-123");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_router_serves_mock_provider() {
    let policy = OriginPolicy::new([".dialogedu.com"]).unwrap();
    let provider = Arc::new(MockTextProvider::new(MockReply::Echo));
    let state = AppState::new("relay-service", policy, provider.clone());
    let router = build_router(state, 1024 * 1024);

    let request = Request::builder()
        .method("POST")
        .uri("/generate")
        .header("Origin", "https://www.dialogedu.com")
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"prompt":"ping"}"#))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["text"], "Mock response for: ping");
    assert_eq!(provider.calls(), 1);
}
