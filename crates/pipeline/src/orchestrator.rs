//! Entry points for the HTTP layer and the scheduler.

use std::sync::Arc;

use imagegen_core::error::CoreError;
use imagegen_core::provider::{ImageProvider, WebhookPayload};
use imagegen_core::store::{StoreError, TaskFilter, TaskStore};
use imagegen_core::task::{validate_new_task, NewTask, Task};
use imagegen_core::types::TaskId;

use crate::config::PipelineConfig;
use crate::dispatcher::{SubmissionDispatcher, SubmissionReport};
use crate::error::PipelineError;
use crate::queue::SubmissionQueue;
use crate::reconciler::{CompletionReconciler, ReconciliationReport};

/// Generating tasks against the configured cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineLoad {
    pub generating: i64,
    pub max_concurrent: usize,
}

/// Composes the store, the provider, the dispatcher and the reconciler.
pub struct Orchestrator {
    store: Arc<dyn TaskStore>,
    provider: Arc<dyn ImageProvider>,
    dispatcher: SubmissionDispatcher,
    reconciler: CompletionReconciler,
    queue: Option<SubmissionQueue>,
    max_concurrent: usize,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn TaskStore>,
        provider: Arc<dyn ImageProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            max_concurrent: config.max_concurrent,
            dispatcher: SubmissionDispatcher::new(store.clone(), provider.clone(), config),
            reconciler: CompletionReconciler::new(store.clone(), provider.clone()),
            store,
            provider,
            queue: None,
        }
    }

    /// Notify `queue` after every accepted task.
    pub fn with_queue(mut self, queue: SubmissionQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Validate and persist a task in `NotSubmitted` state.
    pub async fn create_task(&self, input: NewTask) -> Result<Task, PipelineError> {
        validate_new_task(&input)?;
        let task = self.store.create(&input).await?;

        tracing::info!(
            task_id = %task.id,
            user_id = %task.user_id,
            app_bundle = %task.app_bundle,
            image_size = %task.image_size,
            "Task accepted",
        );

        if let Some(queue) = &self.queue {
            if !queue.try_notify() {
                tracing::warn!(task_id = %task.id, "Submission worker is not running");
            }
        }
        Ok(task)
    }

    pub async fn get_task(&self, id: TaskId) -> Result<Task, PipelineError> {
        self.store
            .get(id)
            .await?
            .ok_or(PipelineError::Core(CoreError::NotFound { entity: "Task", id }))
    }

    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, PipelineError> {
        Ok(self.store.list(filter).await?)
    }

    /// Upload a source image for an image-to-image task and return its URL.
    pub async fn upload_source_image(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        file_name: &str,
    ) -> Result<String, PipelineError> {
        if bytes.is_empty() {
            return Err(CoreError::Validation("Uploaded file is empty".to_string()).into());
        }
        let size = bytes.len();
        let url = self
            .provider
            .upload_image(bytes, content_type, file_name)
            .await?;
        tracing::info!(file_name, size, url = %url, "Source image uploaded");
        Ok(url)
    }

    pub async fn run_submission_cycle(&self) -> SubmissionReport {
        self.dispatcher.run_submission_cycle().await
    }

    pub async fn run_reconciliation_cycle(&self) -> ReconciliationReport {
        self.reconciler.run_reconciliation_cycle().await
    }

    pub async fn handle_webhook(
        &self,
        task_id: TaskId,
        payload: &WebhookPayload,
    ) -> Result<Task, PipelineError> {
        self.reconciler.handle_webhook(task_id, payload).await
    }

    /// Probe the store and report how many slots are in use.
    pub async fn load(&self) -> Result<PipelineLoad, StoreError> {
        self.store.health_check().await?;
        let generating = self.store.count_generating().await?;
        Ok(PipelineLoad {
            generating,
            max_concurrent: self.max_concurrent,
        })
    }
}
