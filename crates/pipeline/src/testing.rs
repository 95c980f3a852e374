//! Scripted provider for pipeline tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use imagegen_core::provider::{
    GeneratedImage, GenerationOutput, GenerationRequest, ImageProvider, ProviderError,
    RequestStatus,
};
use imagegen_core::task::{ImageSize, NewTask};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Submit(GenerationRequest),
    SubmitImageToImage(GenerationRequest, String),
    Upload(String),
    Poll(String),
    Fetch(String),
}

/// Provider whose answers are queued up front. Unscripted submissions
/// succeed with `req-{n}`; unscripted polls report `InProgress`.
#[derive(Default)]
pub struct MockProvider {
    submits: Mutex<VecDeque<Result<String, ProviderError>>>,
    statuses: Mutex<HashMap<String, Result<RequestStatus, ProviderError>>>,
    results: Mutex<HashMap<String, Result<GenerationOutput, ProviderError>>>,
    calls: Mutex<Vec<Call>>,
    submit_delay: Option<Duration>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    pub fn push_submit(&self, result: Result<String, ProviderError>) {
        self.submits.lock().unwrap().push_back(result);
    }

    pub fn set_status(&self, request_id: &str, status: Result<RequestStatus, ProviderError>) {
        self.statuses
            .lock()
            .unwrap()
            .insert(request_id.to_string(), status);
    }

    pub fn set_result(&self, request_id: &str, result: Result<GenerationOutput, ProviderError>) {
        self.results
            .lock()
            .unwrap()
            .insert(request_id.to_string(), result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn submitted_prompts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Submit(r) | Call::SubmitImageToImage(r, _) => Some(r.prompt),
                _ => None,
            })
            .collect()
    }

    async fn next_submit(&self, call: Call) -> Result<String, ProviderError> {
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        let n = calls.len();
        drop(calls);
        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("req-{n}")))
    }
}

#[async_trait]
impl ImageProvider for MockProvider {
    async fn submit(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.next_submit(Call::Submit(request.clone())).await
    }

    async fn submit_image_to_image(
        &self,
        request: &GenerationRequest,
        source_image_url: &str,
    ) -> Result<String, ProviderError> {
        self.next_submit(Call::SubmitImageToImage(
            request.clone(),
            source_image_url.to_string(),
        ))
        .await
    }

    async fn upload_image(
        &self,
        _bytes: Vec<u8>,
        _content_type: &str,
        file_name: &str,
    ) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Upload(file_name.to_string()));
        Ok(format!("https://files.example.com/{file_name}"))
    }

    async fn poll_status(&self, request_id: &str) -> Result<RequestStatus, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Poll(request_id.to_string()));
        self.statuses
            .lock()
            .unwrap()
            .get(request_id)
            .cloned()
            .unwrap_or(Ok(RequestStatus::InProgress))
    }

    async fn fetch_result(&self, request_id: &str) -> Result<GenerationOutput, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Fetch(request_id.to_string()));
        self.results
            .lock()
            .unwrap()
            .get(request_id)
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::MalformedResponse("no result".into())))
    }
}

pub fn new_task(prompt: &str) -> NewTask {
    NewTask {
        prompt: prompt.to_string(),
        image_size: ImageSize::Landscape4x3,
        user_id: "user-1".to_string(),
        app_bundle: "com.example.app".to_string(),
        source_image_url: None,
    }
}

pub fn output(url: &str) -> GenerationOutput {
    GenerationOutput {
        images: vec![GeneratedImage {
            url: url.to_string(),
            width: Some(1024),
            height: Some(768),
            content_type: "image/jpeg".to_string(),
        }],
        seed: Some(7),
    }
}
