//! REST client for the fal queue API.
//!
//! Wraps submission, status polling, result retrieval and source image
//! upload. Every failure is reported as a [`ProviderError`]; timeouts are
//! kept distinct so callers can record them as such.

use async_trait::async_trait;
use imagegen_core::provider::{
    GenerationOutput, GenerationRequest, ImageProvider, ProviderError, RequestStatus,
};

use crate::config::FalConfig;
use crate::messages::{
    StatusResponse, SubmitBody, SubmitResponse, UploadInitiateBody, UploadInitiateResponse,
};

/// HTTP client for the fal queue and storage endpoints.
pub struct FalClient {
    client: reqwest::Client,
    config: FalConfig,
}

impl FalClient {
    /// Build a client with the configured request timeout.
    pub fn new(config: FalConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(map_reqwest_error)?;
        Ok(Self { client, config })
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: FalConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &FalConfig {
        &self.config
    }

    /// `POST {queue}/{model}`.
    fn submit_url(&self, model: &str) -> String {
        format!("{}/{}", self.config.queue_url, model)
    }

    /// `GET {queue}/{app_root}/requests/{id}/status`.
    fn status_url(&self, request_id: &str) -> String {
        format!(
            "{}/{}/requests/{}/status",
            self.config.queue_url,
            app_root(&self.config.model),
            request_id
        )
    }

    /// `GET {queue}/{app_root}/requests/{id}`.
    fn result_url(&self, request_id: &str) -> String {
        format!(
            "{}/{}/requests/{}",
            self.config.queue_url,
            app_root(&self.config.model),
            request_id
        )
    }

    fn upload_initiate_url(&self) -> String {
        format!("{}/storage/upload/initiate", self.config.storage_url)
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.config.api_key)
    }

    async fn submit_to(
        &self,
        model: &str,
        request: &GenerationRequest,
        image_url: Option<&str>,
    ) -> Result<String, ProviderError> {
        let body = SubmitBody {
            prompt: &request.prompt,
            image_size: request.image_size.as_str(),
            seed: request.seed,
            image_url,
        };

        let mut builder = self
            .client
            .post(self.submit_url(model))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&body);
        if let Some(callback) = &request.callback_url {
            builder = builder.query(&[("fal_webhook", callback.as_str())]);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let submitted: SubmitResponse = Self::parse_response(response).await?;

        tracing::debug!(
            model,
            request_id = %submitted.request_id,
            seed = request.seed,
            "Submitted generation request",
        );
        Ok(submitted.request_id)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ProviderError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes).map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl ImageProvider for FalClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.submit_to(&self.config.model, request, None).await
    }

    async fn submit_image_to_image(
        &self,
        request: &GenerationRequest,
        source_image_url: &str,
    ) -> Result<String, ProviderError> {
        self.submit_to(
            &self.config.image_to_image_model,
            request,
            Some(source_image_url),
        )
        .await
    }

    async fn upload_image(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        file_name: &str,
    ) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.upload_initiate_url())
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&UploadInitiateBody {
                content_type,
                file_name,
            })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let initiated: UploadInitiateResponse = Self::parse_response(response).await?;

        let response = self
            .client
            .put(&initiated.upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::ensure_success(response).await?;

        tracing::debug!(file_url = %initiated.file_url, "Uploaded source image");
        Ok(initiated.file_url)
    }

    async fn poll_status(&self, request_id: &str) -> Result<RequestStatus, ProviderError> {
        let response = self
            .client
            .get(self.status_url(request_id))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status: StatusResponse = Self::parse_response(response).await?;
        parse_status(&status)
    }

    async fn fetch_result(&self, request_id: &str) -> Result<GenerationOutput, ProviderError> {
        let response = self
            .client
            .get(self.result_url(request_id))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let output: GenerationOutput = Self::parse_response(response).await?;
        if output.first_image_url().is_none() {
            return Err(ProviderError::MalformedResponse(format!(
                "result for {request_id} contains no images"
            )));
        }
        Ok(output)
    }
}

/// The `owner/app` prefix of a model id, used by status and result routes.
///
/// `fal-ai/flux/schnell` becomes `fal-ai/flux`.
pub fn app_root(model: &str) -> &str {
    match model.match_indices('/').nth(1) {
        Some((idx, _)) => &model[..idx],
        None => model,
    }
}

/// Map a queue status body onto [`RequestStatus`].
pub fn parse_status(status: &StatusResponse) -> Result<RequestStatus, ProviderError> {
    match status.status.as_str() {
        "IN_QUEUE" => Ok(RequestStatus::InQueue {
            position: status.queue_position,
        }),
        "IN_PROGRESS" => Ok(RequestStatus::InProgress),
        "COMPLETED" => Ok(RequestStatus::Completed),
        other => Err(ProviderError::MalformedResponse(format!(
            "unknown queue status \"{other}\""
        ))),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else if err.is_decode() {
        ProviderError::MalformedResponse(err.to_string())
    } else {
        ProviderError::Request(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use imagegen_core::task::ImageSize;

    use super::*;

    fn client() -> FalClient {
        FalClient::new(FalConfig::with_key("test-key")).unwrap()
    }

    #[test]
    fn app_root_keeps_owner_and_app() {
        assert_eq!(app_root("fal-ai/flux/schnell"), "fal-ai/flux");
        assert_eq!(app_root("fal-ai/flux/dev/image-to-image"), "fal-ai/flux");
        assert_eq!(app_root("fal-ai/fast-sdxl"), "fal-ai/fast-sdxl");
        assert_eq!(app_root("standalone"), "standalone");
    }

    #[test]
    fn urls_follow_queue_layout() {
        let client = client();
        assert_eq!(
            client.submit_url("fal-ai/flux/schnell"),
            "https://queue.fal.run/fal-ai/flux/schnell"
        );
        assert_eq!(
            client.status_url("abc"),
            "https://queue.fal.run/fal-ai/flux/requests/abc/status"
        );
        assert_eq!(
            client.result_url("abc"),
            "https://queue.fal.run/fal-ai/flux/requests/abc"
        );
        assert_eq!(
            client.upload_initiate_url(),
            "https://rest.alpha.fal.ai/storage/upload/initiate"
        );
        assert_eq!(client.auth_header(), "Key test-key");
    }

    #[test]
    fn queue_statuses_map_to_request_status() {
        let parse = |s: &str, pos: Option<u32>| {
            parse_status(&StatusResponse {
                status: s.to_string(),
                queue_position: pos,
            })
        };
        assert_eq!(
            parse("IN_QUEUE", Some(2)).unwrap(),
            RequestStatus::InQueue { position: Some(2) }
        );
        assert_eq!(parse("IN_PROGRESS", None).unwrap(), RequestStatus::InProgress);
        assert_eq!(parse("COMPLETED", None).unwrap(), RequestStatus::Completed);
        assert!(matches!(
            parse("EXPLODED", None),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn submit_body_omits_image_url_for_text_to_image() {
        let request = GenerationRequest {
            prompt: "a fox".into(),
            image_size: ImageSize::Square,
            seed: 12,
            callback_url: None,
        };
        let body = SubmitBody {
            prompt: &request.prompt,
            image_size: request.image_size.as_str(),
            seed: request.seed,
            image_url: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "prompt": "a fox", "image_size": "square", "seed": 12 })
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_a_request_error() {
        let mut config = FalConfig::with_key("k");
        // Port 9 (discard) on localhost is closed in test environments.
        config.queue_url = "http://127.0.0.1:9".to_string();
        let client = FalClient::new(config).unwrap();

        let err = client.poll_status("abc").await.unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)), "got {err:?}");
    }
}
