//! Application startup and lifecycle management.

use crate::config::RelayConfig;
use crate::handlers::{
    cors::cors_headers_middleware,
    generate::{generate, method_not_allowed, preflight},
    health::{health_check, not_found, readiness_check},
    metrics::metrics,
};
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::{OriginPolicy, TextProvider};
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, MethodRouter},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

fn relay_route() -> MethodRouter<AppState> {
    post(generate)
        .options(preflight)
        .fallback(method_not_allowed)
}

/// Build the HTTP router.
///
/// The relay is mounted at `/generate` and at `/api/generate`, the path the
/// serverless deployment exposed.
pub fn build_router(state: AppState, max_request_bytes: usize) -> Router {
    let relay_routes = Router::new()
        .route("/generate", relay_route())
        .route("/api/generate", relay_route())
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(from_fn_with_state(state.clone(), cors_headers_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .merge(relay_routes)
        // Route-level so the matched path template is available as a label
        .route_layer(from_fn(metrics_middleware))
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri().path(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the Gemini provider described by `config`.
    pub async fn build(config: RelayConfig) -> Result<Self, AppError> {
        let gemini_config = GeminiConfig::new(&config.gemini, config.generation);
        let provider = GeminiTextProvider::new(gemini_config)
            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;

        tracing::info!(
            model = %config.gemini.model,
            configured = provider.is_configured(),
            timeout_secs = config.gemini.request_timeout.as_secs(),
            "Initialized Gemini text provider"
        );
        if !provider.is_configured() {
            tracing::warn!("GEMINI_API_KEY is not set; generate requests will fail until it is");
        }

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application around an arbitrary provider.
    pub async fn build_with_provider(
        config: RelayConfig,
        text_provider: Arc<dyn TextProvider>,
    ) -> Result<Self, AppError> {
        let origin_policy = OriginPolicy::new(&config.security.allowed_origins)
            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;

        tracing::info!(
            allowed_origins = ?config.security.allowed_origins,
            max_request_bytes = config.max_request_bytes,
            "Initialized origin policy"
        );

        let state = AppState::new(config.service_name.clone(), origin_policy, text_provider);
        let router = build_router(state, config.max_request_bytes);

        // Port 0 binds a random port for testing
        let address = config.common.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("{} listening on port {}", config.service_name, port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT or SIGTERM, then drain in-flight requests.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
