//! Completion reconciler.
//!
//! Finalizes submitted tasks from two sources: provider webhooks (push)
//! and periodic status polling (pull). Whichever arrives first wins; the
//! store's guarded transition makes the second a no-op.

use std::sync::Arc;

use futures::future::join_all;
use imagegen_core::error::CoreError;
use imagegen_core::provider::{ImageProvider, ProviderError, WebhookPayload, WebhookStatus};
use imagegen_core::store::TaskStore;
use imagegen_core::task::{Task, TaskState, TaskStatus, DEFAULT_FAILURE_COMMENT};
use imagegen_core::types::TaskId;

use crate::error::PipelineError;

/// Counters describing one reconciliation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Submitted tasks examined.
    pub checked: usize,
    /// Tasks moved to `Finished`.
    pub finished: usize,
    /// Tasks still queued or running at the provider.
    pub pending: usize,
    /// Tasks whose poll or fetch failed; they stay `Submitted`.
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollOutcome {
    Pending,
    Finished,
    /// Already finalized elsewhere, or nothing to poll.
    Skipped,
}

pub struct CompletionReconciler {
    store: Arc<dyn TaskStore>,
    provider: Arc<dyn ImageProvider>,
}

impl CompletionReconciler {
    pub fn new(store: Arc<dyn TaskStore>, provider: Arc<dyn ImageProvider>) -> Self {
        Self { store, provider }
    }

    /// Apply a provider callback to a task and return the task as stored
    /// afterwards.
    ///
    /// A success payload finishes the task unless it is already in `Error`;
    /// repeating it is harmless. A failure payload moves a non-terminal task
    /// to `Error`. Payloads are validated before the task is touched.
    pub async fn handle_webhook(
        &self,
        task_id: TaskId,
        payload: &WebhookPayload,
    ) -> Result<Task, PipelineError> {
        match payload.status {
            WebhookStatus::Ok => {
                let output = payload.output().map_err(CoreError::Validation)?;
                let result_url = output
                    .first_image_url()
                    .ok_or_else(|| CoreError::Validation("payload contains no image URL".into()))?
                    .to_string();
                self.finish_from_webhook(task_id, payload, result_url).await
            }
            WebhookStatus::Error => {
                let comment = payload
                    .failure_detail()
                    .unwrap_or_else(|| DEFAULT_FAILURE_COMMENT.to_string());
                self.fail_from_webhook(task_id, payload, comment).await
            }
        }
    }

    async fn load(&self, task_id: TaskId) -> Result<Task, PipelineError> {
        self.store
            .get(task_id)
            .await?
            .ok_or(PipelineError::Core(CoreError::NotFound {
                entity: "Task",
                id: task_id,
            }))
    }

    async fn finish_from_webhook(
        &self,
        task_id: TaskId,
        payload: &WebhookPayload,
        result_url: String,
    ) -> Result<Task, PipelineError> {
        let task = self.load(task_id).await?;
        if task.status() == TaskStatus::Error {
            tracing::warn!(
                task_id = %task_id,
                request_id = %payload.request_id,
                "Success callback for failed task ignored",
            );
            return Ok(task);
        }
        if let Some(known) = task.request_id() {
            if known != payload.request_id {
                tracing::warn!(
                    task_id = %task_id,
                    stored = known,
                    received = %payload.request_id,
                    "Callback request id differs from stored one",
                );
            }
        }

        let next = TaskState::Finished {
            request_id: task
                .request_id()
                .unwrap_or(&payload.request_id)
                .to_string(),
            result_url,
        };
        let updated = self
            .store
            .transition(
                task_id,
                &[
                    TaskStatus::NotSubmitted,
                    TaskStatus::Submitted,
                    TaskStatus::Finished,
                ],
                next,
            )
            .await?;

        match updated {
            Some(task) => {
                tracing::info!(task_id = %task_id, "Task finished via callback");
                Ok(task)
            }
            // Moved to Error between load and write.
            None => self.load(task_id).await,
        }
    }

    async fn fail_from_webhook(
        &self,
        task_id: TaskId,
        payload: &WebhookPayload,
        comment: String,
    ) -> Result<Task, PipelineError> {
        let task = self.load(task_id).await?;
        if task.is_terminal() {
            tracing::warn!(
                task_id = %task_id,
                status = %task.status(),
                "Failure callback for terminal task ignored",
            );
            return Ok(task);
        }

        let next = TaskState::Error {
            request_id: Some(
                task.request_id()
                    .unwrap_or(&payload.request_id)
                    .to_string(),
            ),
            comment,
        };
        let updated = self
            .store
            .transition(
                task_id,
                &[TaskStatus::NotSubmitted, TaskStatus::Submitted],
                next,
            )
            .await?;

        match updated {
            Some(task) => {
                tracing::info!(
                    task_id = %task_id,
                    comment = task.state.comment().unwrap_or_default(),
                    "Task failed via callback",
                );
                Ok(task)
            }
            None => self.load(task_id).await,
        }
    }

    /// Poll every submitted task once and finalize the completed ones.
    ///
    /// Tasks are polled concurrently. A failure on one task is logged and
    /// leaves it `Submitted` for the next cycle.
    pub async fn run_reconciliation_cycle(&self) -> ReconciliationReport {
        let mut report = ReconciliationReport::default();

        let tasks = match self.store.list_in_progress().await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list in-progress tasks");
                return report;
            }
        };
        report.checked = tasks.len();
        if tasks.is_empty() {
            return report;
        }

        let outcomes = join_all(tasks.iter().map(|task| self.reconcile_one(task))).await;

        for (task, outcome) in tasks.iter().zip(outcomes) {
            match outcome {
                Ok(PollOutcome::Finished) => report.finished += 1,
                Ok(PollOutcome::Pending) => report.pending += 1,
                Ok(PollOutcome::Skipped) => {}
                Err(e) => {
                    tracing::warn!(task_id = %task.id, error = %e, "Reconciliation failed");
                    report.failed += 1;
                }
            }
        }

        tracing::debug!(
            checked = report.checked,
            finished = report.finished,
            pending = report.pending,
            failed = report.failed,
            "Reconciliation cycle complete",
        );
        report
    }

    async fn reconcile_one(&self, task: &Task) -> Result<PollOutcome, PipelineError> {
        let Some(request_id) = task.request_id() else {
            return Ok(PollOutcome::Skipped);
        };

        let status = self.provider.poll_status(request_id).await?;
        if status.is_pending() {
            return Ok(PollOutcome::Pending);
        }

        let output = self.provider.fetch_result(request_id).await?;
        let result_url = output.first_image_url().ok_or_else(|| {
            ProviderError::MalformedResponse(format!("result for {request_id} contains no images"))
        })?;

        let updated = self
            .store
            .transition(
                task.id,
                &[TaskStatus::Submitted],
                TaskState::Finished {
                    request_id: request_id.to_string(),
                    result_url: result_url.to_string(),
                },
            )
            .await?;

        match updated {
            Some(_) => {
                tracing::info!(task_id = %task.id, request_id, "Task finished via polling");
                Ok(PollOutcome::Finished)
            }
            None => Ok(PollOutcome::Skipped),
        }
    }
}
