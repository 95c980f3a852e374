use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use imagegen_core::memory_store::MemoryTaskStore;
use imagegen_core::provider::{
    GeneratedImage, GenerationOutput, GenerationRequest, ImageProvider, ProviderError,
    RequestStatus,
};
use imagegen_pipeline::{Orchestrator, PipelineConfig};
use tower::ServiceExt;

use imagegen_api::config::{SchedulerConfig, ServerConfig};
use imagegen_api::router::build_app_router;
use imagegen_api::state::AppState;

/// Access token accepted by the test app.
pub const TEST_TOKEN: &str = "test-token";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        access_token: TEST_TOKEN.to_string(),
        scheduler: SchedulerConfig::default(),
    }
}

/// Provider that accepts every submission and reports every request as
/// completed with a fixed image.
pub struct StubProvider;

#[async_trait]
impl ImageProvider for StubProvider {
    async fn submit(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        Ok(format!("req-{}", request.seed))
    }

    async fn submit_image_to_image(
        &self,
        request: &GenerationRequest,
        _source_image_url: &str,
    ) -> Result<String, ProviderError> {
        Ok(format!("req-i2i-{}", request.seed))
    }

    async fn upload_image(
        &self,
        _bytes: Vec<u8>,
        _content_type: &str,
        file_name: &str,
    ) -> Result<String, ProviderError> {
        Ok(format!("https://files.example.com/{file_name}"))
    }

    async fn poll_status(&self, _request_id: &str) -> Result<RequestStatus, ProviderError> {
        Ok(RequestStatus::Completed)
    }

    async fn fetch_result(&self, _request_id: &str) -> Result<GenerationOutput, ProviderError> {
        Ok(GenerationOutput {
            images: vec![GeneratedImage {
                url: "https://cdn.example.com/polled.jpg".to_string(),
                width: Some(1024),
                height: Some(768),
                content_type: "image/jpeg".to_string(),
            }],
            seed: Some(1),
        })
    }
}

/// Router plus handles on the components behind it.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryTaskStore>,
    pub orchestrator: Arc<Orchestrator>,
}

/// Build the full application router with all middleware layers over an
/// in-memory store and [`StubProvider`].
///
/// Uses the same [`build_app_router`] as `main.rs`, so tests exercise the
/// production middleware stack.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryTaskStore::new());
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        Arc::new(StubProvider),
        PipelineConfig::default(),
    ));

    let state = AppState {
        orchestrator: Arc::clone(&orchestrator),
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        orchestrator,
    }
}

/// Send a request through a clone of the router.
pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

/// `GET uri` with the test access token.
pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("access-token", TEST_TOKEN)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// `POST uri` with a JSON body and, optionally, the test access token.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    with_token: bool,
) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if with_token {
        builder = builder.header("access-token", TEST_TOKEN);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body as text.
pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A valid task creation body.
pub fn new_image_body(prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "prompt": prompt,
        "image_size": "landscape_4_3",
        "user_id": "user-1",
        "app_bundle": "com.example.app"
    })
}
