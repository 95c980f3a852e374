//! Image generation task: inputs, lifecycle state, and validation.
//!
//! A task moves `NotSubmitted -> Submitted -> Finished | Error`, or straight
//! from `NotSubmitted` to `Error` when the provider rejects the submission.
//! Each state carries exactly the fields that are meaningful for it, so a
//! task can never hold a result URL and a failure comment at the same time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{TaskId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum prompt length in characters.
pub const MAX_PROMPT_LEN: usize = 4000;

/// Maximum length of `user_id` and `app_bundle`.
pub const MAX_IDENTIFIER_LEN: usize = 255;

/// Comment written when the provider reports a failure without any detail.
pub const DEFAULT_FAILURE_COMMENT: &str = "Provider reported failure";

// ---------------------------------------------------------------------------
// Image size
// ---------------------------------------------------------------------------

/// Output dimensions preset understood by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSize {
    SquareHd,
    Square,
    #[serde(rename = "portrait_4_3")]
    Portrait4x3,
    #[serde(rename = "portrait_16_9")]
    Portrait16x9,
    #[serde(rename = "landscape_4_3")]
    Landscape4x3,
    #[serde(rename = "landscape_16_9")]
    Landscape16x9,
}

impl ImageSize {
    pub const ALL: [ImageSize; 6] = [
        ImageSize::SquareHd,
        ImageSize::Square,
        ImageSize::Portrait4x3,
        ImageSize::Portrait16x9,
        ImageSize::Landscape4x3,
        ImageSize::Landscape16x9,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::SquareHd => "square_hd",
            ImageSize::Square => "square",
            ImageSize::Portrait4x3 => "portrait_4_3",
            ImageSize::Portrait16x9 => "portrait_16_9",
            ImageSize::Landscape4x3 => "landscape_4_3",
            ImageSize::Landscape16x9 => "landscape_16_9",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageSize::ALL
            .into_iter()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown image size: \"{s}\"")))
    }
}

// ---------------------------------------------------------------------------
// Status and state
// ---------------------------------------------------------------------------

/// Field-less discriminant of [`TaskState`], used for filters and guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotSubmitted,
    Submitted,
    Finished,
    Error,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotSubmitted => "not_submitted",
            TaskStatus::Submitted => "submitted",
            TaskStatus::Finished => "finished",
            TaskStatus::Error => "error",
        }
    }

    /// Finished and Error are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Finished | TaskStatus::Error)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskState {
    /// Persisted but not yet handed to the provider.
    NotSubmitted,
    /// Accepted by the provider; awaiting a result.
    Submitted { request_id: String },
    /// Result available.
    Finished {
        request_id: String,
        result_url: String,
    },
    /// Terminal failure. `request_id` is present when the failure happened
    /// after a successful submission.
    Error {
        request_id: Option<String>,
        comment: String,
    },
}

impl TaskState {
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskState::NotSubmitted => TaskStatus::NotSubmitted,
            TaskState::Submitted { .. } => TaskStatus::Submitted,
            TaskState::Finished { .. } => TaskStatus::Finished,
            TaskState::Error { .. } => TaskStatus::Error,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            TaskState::NotSubmitted => None,
            TaskState::Submitted { request_id } | TaskState::Finished { request_id, .. } => {
                Some(request_id)
            }
            TaskState::Error { request_id, .. } => request_id.as_deref(),
        }
    }

    pub fn result_url(&self) -> Option<&str> {
        match self {
            TaskState::Finished { result_url, .. } => Some(result_url),
            _ => None,
        }
    }

    pub fn comment(&self) -> Option<&str> {
        match self {
            TaskState::Error { comment, .. } => Some(comment),
            _ => None,
        }
    }

    /// Carry an earlier request id into an `Error` state that lacks one.
    ///
    /// A request id, once assigned, is never cleared.
    pub fn preserving_request_id(self, previous: Option<&str>) -> Self {
        match self {
            TaskState::Error {
                request_id: None,
                comment,
            } => TaskState::Error {
                request_id: previous.map(str::to_string),
                comment,
            },
            other => other,
        }
    }

    /// Rebuild a state from its flattened column representation.
    ///
    /// Used by persistent stores; rejects combinations that no variant
    /// can hold (e.g. a finished task without a result URL).
    pub fn from_parts(
        status: TaskStatus,
        request_id: Option<String>,
        result_url: Option<String>,
        comment: Option<String>,
    ) -> Result<Self, String> {
        match (status, request_id, result_url, comment) {
            (TaskStatus::NotSubmitted, None, None, None) => Ok(TaskState::NotSubmitted),
            (TaskStatus::Submitted, Some(request_id), None, None) => {
                Ok(TaskState::Submitted { request_id })
            }
            (TaskStatus::Finished, Some(request_id), Some(result_url), None) => {
                Ok(TaskState::Finished {
                    request_id,
                    result_url,
                })
            }
            (TaskStatus::Error, request_id, None, Some(comment)) => {
                Ok(TaskState::Error {
                    request_id,
                    comment,
                })
            }
            (status, request_id, result_url, comment) => Err(format!(
                "inconsistent task columns for status {status}: request_id={}, result_url={}, comment={}",
                request_id.is_some(),
                result_url.is_some(),
                comment.is_some(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A single image generation request and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub state: TaskState,
    pub prompt: String,
    pub image_size: ImageSize,
    pub user_id: String,
    pub app_bundle: String,
    /// Set for image-to-image variants.
    pub source_image_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    pub fn status(&self) -> TaskStatus {
        self.state.status()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.state.request_id()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTask {
    pub prompt: String,
    pub image_size: ImageSize,
    pub user_id: String,
    pub app_bundle: String,
    #[serde(default)]
    pub source_image_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate task input before it is persisted.
///
/// Rules:
/// - `prompt` must not be blank and must not exceed [`MAX_PROMPT_LEN`] characters.
/// - `user_id` and `app_bundle` must not be blank and must not exceed
///   [`MAX_IDENTIFIER_LEN`] characters.
/// - `source_image_url`, when present, must be an `http` or `https` URL.
pub fn validate_new_task(input: &NewTask) -> Result<(), CoreError> {
    if input.prompt.trim().is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".to_string()));
    }
    if input.prompt.chars().count() > MAX_PROMPT_LEN {
        return Err(CoreError::Validation(format!(
            "Prompt must not exceed {MAX_PROMPT_LEN} characters"
        )));
    }
    validate_identifier("user_id", &input.user_id)?;
    validate_identifier("app_bundle", &input.app_bundle)?;

    if let Some(url) = &input.source_image_url {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(CoreError::Validation(
                "source_image_url must be an http(s) URL".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_identifier(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(CoreError::Validation(format!(
            "{field} must not exceed {MAX_IDENTIFIER_LEN} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
