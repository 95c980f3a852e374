//! Handlers for the `/images` resource.
//!
//! Everything except the provider webhook requires [`AccessToken`].

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use imagegen_core::provider::WebhookPayload;
use imagegen_core::store::TaskFilter;
use imagegen_core::task::{ImageSize, NewTask, Task, TaskStatus};
use imagegen_core::types::{TaskId, Timestamp};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AccessToken;
use crate::response::DataResponse;
use crate::state::AppState;

/// Multipart field holding the uploaded image.
const UPLOAD_FIELD: &str = "file";

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Client-facing representation of a task.
///
/// `is_finished` and `is_invalid` are derived from the status so clients can
/// branch without knowing every status value.
#[derive(Debug, Serialize)]
pub struct TaskView {
    pub id: TaskId,
    pub status: TaskStatus,
    pub is_finished: bool,
    pub is_invalid: bool,
    pub image_url: Option<String>,
    pub comment: Option<String>,
    pub request_id: Option<String>,
    pub prompt: String,
    pub image_size: ImageSize,
    pub user_id: String,
    pub app_bundle: String,
    pub source_image_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        let status = task.status();
        Self {
            id: task.id,
            status,
            is_finished: status == TaskStatus::Finished,
            is_invalid: status == TaskStatus::Error,
            image_url: task.state.result_url().map(str::to_string),
            comment: task.state.comment().map(str::to_string),
            request_id: task.request_id().map(str::to_string),
            prompt: task.prompt,
            image_size: task.image_size,
            user_id: task.user_id,
            app_bundle: task.app_bundle,
            source_image_url: task.source_image_url,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadView {
    pub url: String,
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

/// POST /api/v1/images
///
/// Accept a generation request. Returns 201 with the task in
/// `not_submitted` status; submission happens in the background.
pub async fn create_image(
    _auth: AccessToken,
    State(state): State<AppState>,
    input: Result<Json<NewTask>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = input?;
    let task = state.orchestrator.create_task(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: TaskView::from(task),
        }),
    ))
}

/// POST /api/v1/images/uploads
///
/// Upload a source image for an image-to-image request. Expects a multipart
/// body with a `file` field and returns the hosted URL to pass as
/// `source_image_url`.
pub async fn upload_source_image(
    _auth: AccessToken,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::BadRequest(format!(
                "Unsupported content type: {content_type}"
            )));
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let url = state
            .orchestrator
            .upload_source_image(data.to_vec(), &content_type, &file_name)
            .await?;

        return Ok((
            StatusCode::CREATED,
            Json(DataResponse {
                data: UploadView { url },
            }),
        ));
    }

    Err(AppError::BadRequest(format!(
        "Multipart field '{UPLOAD_FIELD}' is required"
    )))
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// GET /api/v1/images/{id}
pub async fn get_image(
    _auth: AccessToken,
    State(state): State<AppState>,
    id: Result<Path<TaskId>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(id) = id?;
    let task = state.orchestrator.get_task(id).await?;
    Ok(Json(DataResponse {
        data: TaskView::from(task),
    }))
}

/// GET /api/v1/images
///
/// Newest first. Supports optional `status`, `user_id`, `app_bundle`,
/// `limit` and `offset` query parameters.
pub async fn list_images(
    _auth: AccessToken,
    State(state): State<AppState>,
    filter: Result<Query<TaskFilter>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(filter) = filter?;
    let tasks = state.orchestrator.list_tasks(&filter).await?;
    let data: Vec<TaskView> = tasks.into_iter().map(TaskView::from).collect();
    Ok(Json(DataResponse { data }))
}

// ---------------------------------------------------------------------------
// Provider callback
// ---------------------------------------------------------------------------

/// POST /api/v1/images/{id}/webhook
///
/// Called by the provider when a request settles. Unauthenticated; the task
/// id in the path is unguessable. The body is parsed by hand so malformed
/// payloads get the standard error envelope.
pub async fn provider_webhook(
    State(state): State<AppState>,
    id: Result<Path<TaskId>, PathRejection>,
    body: Bytes,
) -> AppResult<&'static str> {
    let Path(id) = id?;
    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(task_id = %id, error = %e, "Rejected malformed webhook body");
        AppError::BadRequest(format!("Invalid webhook payload: {e}"))
    })?;

    let task = state.orchestrator.handle_webhook(id, &payload).await?;
    tracing::debug!(task_id = %id, status = %task.status(), "Webhook processed");
    Ok("OK")
}
