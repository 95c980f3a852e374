//! Contract for the external image generation provider.
//!
//! Implementations perform network calls only and hold no task state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::task::ImageSize;

/// Upper bound (exclusive) for generation seeds.
pub const MAX_SEED: u64 = 1_000_000_000;

/// Errors raised by a provider call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The call did not complete within the client's timeout.
    #[error("Timeout")]
    Timeout,

    /// The request could not be sent or the connection failed.
    #[error("Provider request failed: {0}")]
    Request(String),

    /// The provider answered with a non-2xx status.
    #[error("Provider API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The provider answered with a body we cannot use.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Parameters for one generation submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image_size: ImageSize,
    pub seed: u64,
    /// Where the provider should push the result, if anywhere.
    pub callback_url: Option<String>,
}

/// Queue status of a submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    InQueue { position: Option<u32> },
    InProgress,
    Completed,
}

impl RequestStatus {
    /// True while no result can be fetched yet.
    pub fn is_pending(self) -> bool {
        !matches!(self, RequestStatus::Completed)
    }
}

/// A single generated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    "image/jpeg".to_string()
}

/// Output of a completed generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub images: Vec<GeneratedImage>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl GenerationOutput {
    /// URL of the first image, if the output contains a usable one.
    pub fn first_image_url(&self) -> Option<&str> {
        self.images
            .first()
            .map(|image| image.url.as_str())
            .filter(|url| !url.is_empty())
    }
}

/// Outcome reported by a provider callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebhookStatus {
    Ok,
    Error,
}

/// Body the provider posts to the callback URL once a request settles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub request_id: String,
    pub status: WebhookStatus,
    /// Generation output on success; error detail on failure.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl WebhookPayload {
    /// Parse the success payload into a [`GenerationOutput`] that carries at
    /// least one usable image URL.
    pub fn output(&self) -> Result<GenerationOutput, String> {
        let value = self
            .payload
            .clone()
            .ok_or_else(|| "payload is missing".to_string())?;
        let output: GenerationOutput =
            serde_json::from_value(value).map_err(|e| format!("payload is malformed: {e}"))?;
        if output.first_image_url().is_none() {
            return Err("payload contains no image URL".to_string());
        }
        Ok(output)
    }

    /// Human-readable failure detail, if the provider sent one.
    pub fn failure_detail(&self) -> Option<String> {
        if let Some(error) = self.error.as_deref().filter(|e| !e.trim().is_empty()) {
            return Some(error.to_string());
        }
        match self.payload.as_ref()?.get("detail")? {
            serde_json::Value::String(detail) => Some(detail.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// External image generation service.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Submit a text-to-image request. Returns the provider request id.
    async fn submit(&self, request: &GenerationRequest) -> Result<String, ProviderError>;

    /// Submit an image-to-image request based on a previously uploaded image.
    async fn submit_image_to_image(
        &self,
        request: &GenerationRequest,
        source_image_url: &str,
    ) -> Result<String, ProviderError>;

    /// Upload a source image and return its provider-hosted URL.
    async fn upload_image(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        file_name: &str,
    ) -> Result<String, ProviderError>;

    /// Query the queue status of a request. Has no side effects.
    async fn poll_status(&self, request_id: &str) -> Result<RequestStatus, ProviderError>;

    /// Fetch the output of a completed request.
    async fn fetch_result(&self, request_id: &str) -> Result<GenerationOutput, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_displays_as_bare_word() {
        assert_eq!(ProviderError::Timeout.to_string(), "Timeout");
    }

    #[test]
    fn only_completed_is_not_pending() {
        assert!(RequestStatus::InQueue { position: Some(3) }.is_pending());
        assert!(RequestStatus::InProgress.is_pending());
        assert!(!RequestStatus::Completed.is_pending());
    }

    #[test]
    fn output_parses_with_missing_optional_fields() {
        let output: GenerationOutput = serde_json::from_value(serde_json::json!({
            "images": [{ "url": "https://cdn/a.jpg", "width": 1024, "height": 768 }],
            "seed": 42
        }))
        .unwrap();

        assert_eq!(output.first_image_url(), Some("https://cdn/a.jpg"));
        assert_eq!(output.images[0].content_type, "image/jpeg");
        assert_eq!(output.seed, Some(42));
    }

    #[test]
    fn webhook_success_payload_yields_output() {
        let hook: WebhookPayload = serde_json::from_value(serde_json::json!({
            "request_id": "req-1",
            "status": "OK",
            "payload": {
                "images": [{ "url": "https://cdn/a.jpg", "width": 512, "height": 512 }],
                "seed": 7
            }
        }))
        .unwrap();

        assert_eq!(hook.status, WebhookStatus::Ok);
        let output = hook.output().unwrap();
        assert_eq!(output.first_image_url(), Some("https://cdn/a.jpg"));
    }

    #[test]
    fn webhook_without_images_is_invalid() {
        let hook = WebhookPayload {
            request_id: "req-1".into(),
            status: WebhookStatus::Ok,
            payload: Some(serde_json::json!({ "images": [], "seed": 1 })),
            error: None,
        };
        assert!(hook.output().unwrap_err().contains("no image URL"));

        let missing = WebhookPayload {
            payload: None,
            ..hook
        };
        assert!(missing.output().is_err());
    }

    #[test]
    fn failure_detail_prefers_error_field() {
        let hook = WebhookPayload {
            request_id: "req-1".into(),
            status: WebhookStatus::Error,
            payload: Some(serde_json::json!({ "detail": "from payload" })),
            error: Some("Invalid status code: 422".into()),
        };
        assert_eq!(hook.failure_detail().as_deref(), Some("Invalid status code: 422"));

        let from_payload = WebhookPayload { error: None, ..hook };
        assert_eq!(from_payload.failure_detail().as_deref(), Some("from payload"));

        let structured = WebhookPayload {
            payload: Some(serde_json::json!({ "detail": [{ "msg": "bad prompt" }] })),
            ..from_payload
        };
        assert!(structured.failure_detail().unwrap().contains("bad prompt"));
    }

    #[test]
    fn empty_output_has_no_first_url() {
        let output = GenerationOutput {
            images: vec![],
            seed: None,
        };
        assert_eq!(output.first_image_url(), None);
    }
}
