//! Row struct for the `tasks` table and its mapping to the domain [`Task`].

use imagegen_core::task::{Task, TaskState};
use imagegen_core::types::{TaskId, Timestamp};
use sqlx::FromRow;

use super::status::{StatusId, TaskStatusId};

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: TaskId,
    pub status_id: StatusId,
    pub request_id: Option<String>,
    pub result_url: Option<String>,
    pub comment: Option<String>,
    pub prompt: String,
    pub image_size: String,
    pub user_id: String,
    pub app_bundle: String,
    pub source_image_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TaskRow {
    /// Convert into a domain task, rejecting rows whose columns do not form
    /// a valid state.
    pub fn into_task(self) -> Result<Task, String> {
        let status = TaskStatusId::from_id(self.status_id)
            .ok_or_else(|| format!("task {}: unknown status_id {}", self.id, self.status_id))?;
        let image_size = self
            .image_size
            .parse()
            .map_err(|e| format!("task {}: {e}", self.id))?;
        let state = TaskState::from_parts(
            status.into(),
            self.request_id,
            self.result_url,
            self.comment,
        )
        .map_err(|e| format!("task {}: {e}", self.id))?;

        Ok(Task {
            id: self.id,
            state,
            prompt: self.prompt,
            image_size,
            user_id: self.user_id,
            app_bundle: self.app_bundle,
            source_image_url: self.source_image_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// The state columns of a task, flattened for binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateColumns {
    pub status_id: StatusId,
    pub request_id: Option<String>,
    pub result_url: Option<String>,
    pub comment: Option<String>,
}

impl From<&TaskState> for StateColumns {
    fn from(state: &TaskState) -> Self {
        Self {
            status_id: TaskStatusId::from(state.status()).id(),
            request_id: state.request_id().map(str::to_string),
            result_url: state.result_url().map(str::to_string),
            comment: state.comment().map(str::to_string),
        }
    }
}
