//! Wire types for the fal queue and storage endpoints.

use serde::{Deserialize, Serialize};

/// Body sent to the queue submit endpoint.
#[derive(Debug, Serialize)]
pub struct SubmitBody<'a> {
    pub prompt: &'a str,
    pub image_size: &'a str,
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<&'a str>,
}

/// Response of the queue submit endpoint.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub request_id: String,
}

/// Response of the queue status endpoint.
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    /// `IN_QUEUE`, `IN_PROGRESS` or `COMPLETED`.
    pub status: String,
    #[serde(default)]
    pub queue_position: Option<u32>,
}

/// Body sent to the storage upload initiation endpoint.
#[derive(Debug, Serialize)]
pub struct UploadInitiateBody<'a> {
    pub content_type: &'a str,
    pub file_name: &'a str,
}

/// Response of the storage upload initiation endpoint.
#[derive(Debug, Deserialize)]
pub struct UploadInitiateResponse {
    /// Pre-signed URL the bytes are `PUT` to.
    pub upload_url: String,
    /// Public URL of the uploaded file.
    pub file_url: String,
}
