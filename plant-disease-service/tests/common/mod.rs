#![allow(dead_code)]

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use plant_disease_service::config::{GroqConfig, ModelConfig, ServiceConfig, UploadConfig};
use plant_disease_service::services::classifier::mock::MockClassifier;
use plant_disease_service::services::providers::groq::GroqChatProvider;
use plant_disease_service::services::providers::mock::MockChatProvider;
use plant_disease_service::services::providers::ChatProvider;
use plant_disease_service::services::ImageClassifier;
use plant_disease_service::startup::{AppState, Application};
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const TEST_API_KEY: &str = "gsk_test_key";

/// Configuration that never touches the environment.
pub fn test_config(groq_base_url: &str) -> ServiceConfig {
    ServiceConfig {
        common: CoreConfig { port: 0 },
        model: ModelConfig {
            path: "target/test-models/missing.onnx".to_string(),
            input_size: 128,
            intra_threads: 1,
        },
        groq: GroqConfig {
            api_key: Secret::new(TEST_API_KEY.to_string()),
            base_url: groq_base_url.to_string(),
            model: "llama3-8b-8192".to_string(),
            temperature: 0.7,
            max_tokens: 200,
            timeout: Duration::from_secs(5),
        },
        upload: UploadConfig {
            max_bytes: 10 * 1024 * 1024,
        },
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn with a mock classifier and a mock chat provider.
    pub async fn spawn() -> Self {
        Self::spawn_with(
            MockClassifier::by_brightness(),
            Arc::new(MockChatProvider::new()),
        )
        .await
    }

    pub async fn spawn_with_classifier(classifier: impl ImageClassifier + 'static) -> Self {
        Self::spawn_with(classifier, Arc::new(MockChatProvider::new())).await
    }

    pub async fn spawn_with(
        classifier: impl ImageClassifier + 'static,
        chat_provider: Arc<dyn ChatProvider>,
    ) -> Self {
        let config = test_config("http://127.0.0.1:9/unused");
        Self::spawn_with_config(&config, classifier, chat_provider).await
    }

    pub async fn spawn_with_config(
        config: &ServiceConfig,
        classifier: impl ImageClassifier + 'static,
        chat_provider: Arc<dyn ChatProvider>,
    ) -> Self {
        let state = AppState::new(config, Arc::new(classifier), chat_provider);
        let app = Application::with_state(0, state)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let address = format!("http://127.0.0.1:{}", port);

        // Wait for the server by polling the liveness endpoint
        for _ in 0..50 {
            if client.get(format!("{}/health", address)).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    /// Spawn against a Groq-compatible upstream served by `upstream`.
    pub async fn spawn_with_upstream(upstream: &MockUpstream, timeout: Duration) -> Self {
        let mut config = test_config(&upstream.base_url);
        config.groq.timeout = timeout;
        let provider = GroqChatProvider::new(&config.groq).expect("Failed to build Groq provider");
        Self::spawn_with_config(&config, MockClassifier::by_brightness(), Arc::new(provider)).await
    }

    pub async fn post_image(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> reqwest::Response {
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes)
                .file_name(file_name.to_string())
                .mime_str(content_type)
                .expect("valid mime"),
        );

        self.client
            .post(format!("{}/predict", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_chat(&self, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/chat", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Solid-colour PNG.
pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color))),
        ImageFormat::Png,
    )
}

pub fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).expect("encode image");
    buf.into_inner()
}

/// What the fake upstream saw on its last call.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct UpstreamState {
    status: StatusCode,
    body: Arc<String>,
    delay: Duration,
    captured: Arc<Mutex<Option<CapturedRequest>>>,
}

/// Fake OpenAI-compatible chat completion server.
pub struct MockUpstream {
    pub base_url: String,
    captured: Arc<Mutex<Option<CapturedRequest>>>,
}

impl MockUpstream {
    /// Reply `content` as the first choice.
    pub async fn replying(content: &str) -> Self {
        let body = json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "model": "llama3-8b-8192",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 48, "completion_tokens": 12, "total_tokens": 60}
        });
        Self::start(StatusCode::OK, body.to_string(), Duration::ZERO).await
    }

    pub async fn start(status: StatusCode, body: String, delay: Duration) -> Self {
        let captured = Arc::new(Mutex::new(None));
        let state = UpstreamState {
            status,
            body: Arc::new(body),
            delay,
            captured: captured.clone(),
        };

        let router = Router::new()
            .route("/openai/v1/chat/completions", post(completions))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock upstream");
        let port = listener.local_addr().expect("local addr").port();

        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        MockUpstream {
            base_url: format!("http://127.0.0.1:{}/openai/v1", port),
            captured,
        }
    }

    pub fn last_request(&self) -> Option<CapturedRequest> {
        self.captured.lock().expect("capture lock").clone()
    }
}

async fn completions(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *state.captured.lock().expect("capture lock") = Some(CapturedRequest {
        authorization,
        body,
    });

    tokio::time::sleep(state.delay).await;

    (
        state.status,
        [("content-type", "application/json")],
        state.body.as_ref().clone(),
    )
}
