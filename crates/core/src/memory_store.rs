//! In-process [`TaskStore`] backed by a `HashMap`.
//!
//! Used by tests and by local runs without `DATABASE_URL`. All operations
//! take the lock once, so a guarded transition is atomic with respect to
//! other callers.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::store::{StoreError, TaskFilter, TaskStore};
use crate::task::{NewTask, Task, TaskState, TaskStatus};
use crate::types::TaskId;

/// A stored task plus its insertion sequence, which breaks `created_at` ties.
struct Entry {
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    tasks: HashMap<TaskId, Entry>,
}

/// Memory-backed task store.
#[derive(Default)]
pub struct MemoryTaskStore {
    inner: RwLock<Inner>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    pub async fn len(&self) -> usize {
        self.inner.read().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Tasks matching `pred`, oldest first.
    async fn collect_sorted<F>(&self, pred: F) -> Vec<Task>
    where
        F: Fn(&Task) -> bool,
    {
        let inner = self.inner.read().await;
        let mut entries: Vec<&Entry> = inner.tasks.values().filter(|e| pred(&e.task)).collect();
        entries.sort_by_key(|e| (e.task.created_at, e.seq));
        entries.into_iter().map(|e| e.task.clone()).collect()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, input: &NewTask) -> Result<Task, StoreError> {
        let now = Utc::now();
        let task = Task {
            id: TaskId::now_v7(),
            state: TaskState::NotSubmitted,
            prompt: input.prompt.clone(),
            image_size: input.image_size,
            user_id: input.user_id.clone(),
            app_bundle: input.app_bundle.clone(),
            source_image_url: input.source_image_url.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.write().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.tasks.insert(
            task.id,
            Entry {
                seq,
                task: task.clone(),
            },
        );
        Ok(task)
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.tasks.get(&id).map(|e| e.task.clone()))
    }

    async fn transition(
        &self,
        id: TaskId,
        expected: &[TaskStatus],
        next: TaskState,
    ) -> Result<Option<Task>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.tasks.get_mut(&id) else {
            return Ok(None);
        };
        if !expected.contains(&entry.task.status()) {
            return Ok(None);
        }
        let previous = entry.task.request_id().map(str::to_string);
        entry.task.state = next.preserving_request_id(previous.as_deref());
        entry.task.updated_at = Utc::now();
        Ok(Some(entry.task.clone()))
    }

    async fn list_not_yet_submitted(&self, limit: usize) -> Result<Vec<Task>, StoreError> {
        let mut tasks = self
            .collect_sorted(|t| t.status() == TaskStatus::NotSubmitted)
            .await;
        tasks.truncate(limit);
        Ok(tasks)
    }

    async fn list_in_progress(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .collect_sorted(|t| t.status() == TaskStatus::Submitted)
            .await)
    }

    async fn count_generating(&self) -> Result<i64, StoreError> {
        let inner = self.inner.read().await;
        let count = inner
            .tasks
            .values()
            .filter(|e| e.task.status() == TaskStatus::Submitted)
            .count();
        Ok(count as i64)
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let mut tasks = self.collect_sorted(|t| filter.matches(t)).await;
        tasks.reverse();
        Ok(tasks
            .into_iter()
            .skip(filter.effective_offset() as usize)
            .take(filter.effective_limit() as usize)
            .collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
