//! Task persistence contract.
//!
//! State changes go through [`TaskStore::transition`], which only applies
//! when the task is still in one of the expected statuses. This keeps a
//! late or duplicate writer from overwriting a task that has already moved
//! on (e.g. a terminal task).

use async_trait::async_trait;
use serde::Deserialize;

use crate::task::{NewTask, Task, TaskState, TaskStatus};
use crate::types::TaskId;

/// Default page size for task listing.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Maximum page size for task listing.
pub const MAX_LIST_LIMIT: i64 = 100;

/// Errors raised by a task store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row cannot be mapped back to a valid task.
    #[error("Corrupt task record: {0}")]
    Corrupt(String),
}

/// Filter for the admin task listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub user_id: Option<String>,
    pub app_bundle: Option<String>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

impl TaskFilter {
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |s| task.status() == s)
            && self.user_id.as_deref().map_or(true, |u| task.user_id == u)
            && self
                .app_bundle
                .as_deref()
                .map_or(true, |b| task.app_bundle == b)
    }
}

/// Storage backend for tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task in state `NotSubmitted`.
    async fn create(&self, input: &NewTask) -> Result<Task, StoreError>;

    /// Load a task by id. `None` if unknown.
    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Move a task to `next` if its current status is one of `expected`.
    ///
    /// Every column of the new state is written, including nulls. Returns
    /// the updated task, or `None` if the task is unknown or the guard did
    /// not match.
    async fn transition(
        &self,
        id: TaskId,
        expected: &[TaskStatus],
        next: TaskState,
    ) -> Result<Option<Task>, StoreError>;

    /// Up to `limit` tasks in `NotSubmitted`, oldest first
    /// (`created_at`, then `id`).
    async fn list_not_yet_submitted(&self, limit: usize) -> Result<Vec<Task>, StoreError>;

    /// All tasks awaiting a provider result (`Submitted`).
    async fn list_in_progress(&self) -> Result<Vec<Task>, StoreError>;

    /// Number of tasks currently generating at the provider.
    async fn count_generating(&self) -> Result<i64, StoreError>;

    /// Filtered listing, newest first.
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> Result<(), StoreError>;
}
