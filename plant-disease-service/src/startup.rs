//! Application startup and lifecycle management.
//!
//! Builds the shared state (loaded model + chat relay), the HTTP router and its
//! middleware stack, and runs the server until a shutdown signal arrives.

use crate::config::ServiceConfig;
use crate::handlers;
use crate::services::classifier::onnx::OnnxClassifier;
use crate::services::providers::groq::GroqChatProvider;
use crate::services::providers::{ChatProvider, CompletionParams};
use crate::services::{FarmingAssistant, ImageClassifier};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn ImageClassifier>,
    pub assistant: FarmingAssistant,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        config: &ServiceConfig,
        classifier: Arc<dyn ImageClassifier>,
        chat_provider: Arc<dyn ChatProvider>,
    ) -> Self {
        let params = CompletionParams {
            temperature: config.groq.temperature,
            max_tokens: config.groq.max_tokens,
        };

        Self {
            classifier,
            assistant: FarmingAssistant::new(chat_provider, params),
            max_upload_bytes: config.upload.max_bytes,
        }
    }
}

/// Build the HTTP router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/predict", post(handlers::predict))
        .route("/chat", post(handlers::chat))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

type ServerFuture = Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>;

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    server: ServerFuture,
}

impl Application {
    /// Load the model and chat provider described by `config`, then bind.
    ///
    /// A missing or unreadable model aborts startup.
    pub async fn build(config: ServiceConfig) -> Result<Self, AppError> {
        let model_config = config.model.clone();
        let classifier = tokio::task::spawn_blocking(move || OnnxClassifier::load(&model_config))
            .await
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("model loader panicked: {}", e)))?
            .map_err(|e| {
                tracing::error!(path = %config.model.path, "Failed to load model: {}", e);
                AppError::ConfigError(anyhow::Error::new(e))
            })?;

        let chat_provider = GroqChatProvider::new(&config.groq).map_err(|e| {
            tracing::error!("Failed to initialize chat provider: {}", e);
            AppError::ConfigError(anyhow::Error::new(e))
        })?;

        tracing::info!(
            model = %config.groq.model,
            timeout_secs = config.groq.timeout.as_secs(),
            "Initialized Groq chat provider"
        );

        let state = AppState::new(&config, Arc::new(classifier), Arc::new(chat_provider));
        Self::with_state(config.common.port, state).await
    }

    /// Bind on `port` (0 = random) and serve `state`.
    pub async fn with_state(port: u16, state: AppState) -> Result<Self, AppError> {
        let app = build_router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
        };

        Ok(Self {
            port,
            server: Box::pin(server),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
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
