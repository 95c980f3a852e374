//! Submission dispatcher.
//!
//! Selects not-yet-submitted tasks, oldest first, and hands them to the
//! provider while keeping the number of generating tasks at or below
//! [`PipelineConfig::max_concurrent`]. Cycles are serialized in-process by
//! an async mutex; across processes sharing one store the cap is soft.

use std::sync::Arc;

use imagegen_core::provider::{GenerationRequest, ImageProvider, ProviderError, MAX_SEED};
use imagegen_core::store::TaskStore;
use imagegen_core::task::{Task, TaskState, TaskStatus};
use rand::Rng;
use tokio::sync::Mutex;

use crate::config::PipelineConfig;

/// Counters describing one submission cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    /// Tasks generating when the cycle started.
    pub generating: i64,
    /// Tasks selected for submission.
    pub selected: usize,
    /// Tasks accepted by the provider.
    pub submitted: usize,
    /// Tasks moved to `Error` because submission failed.
    pub failed: usize,
}

/// What happened to one selected task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmitOutcome {
    Submitted,
    Failed,
    /// The task left `NotSubmitted` concurrently or the write failed.
    Skipped,
}

pub struct SubmissionDispatcher {
    store: Arc<dyn TaskStore>,
    provider: Arc<dyn ImageProvider>,
    config: PipelineConfig,
    cycle_lock: Mutex<()>,
}

impl SubmissionDispatcher {
    pub fn new(
        store: Arc<dyn TaskStore>,
        provider: Arc<dyn ImageProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
            cycle_lock: Mutex::new(()),
        }
    }

    /// Run one submission cycle.
    ///
    /// Never fails: store errors end the cycle early and provider errors
    /// are recorded on the task. Concurrent callers wait for each other.
    pub async fn run_submission_cycle(&self) -> SubmissionReport {
        let _guard = self.cycle_lock.lock().await;
        let mut report = SubmissionReport::default();

        let generating = match self.store.count_generating().await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, "Failed to count generating tasks");
                return report;
            }
        };
        report.generating = generating;

        let cap = i64::try_from(self.config.max_concurrent).unwrap_or(i64::MAX);
        if generating >= cap {
            tracing::debug!(generating, cap, "Concurrency cap reached, nothing to submit");
            return report;
        }
        let slots = usize::try_from(cap - generating).unwrap_or(0);

        let tasks = match self.store.list_not_yet_submitted(slots).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list not-yet-submitted tasks");
                return report;
            }
        };
        report.selected = tasks.len();

        for task in &tasks {
            match self.submit_one(task).await {
                SubmitOutcome::Submitted => report.submitted += 1,
                SubmitOutcome::Failed => report.failed += 1,
                SubmitOutcome::Skipped => {}
            }
        }

        if report.selected > 0 {
            tracing::info!(
                generating = report.generating,
                selected = report.selected,
                submitted = report.submitted,
                failed = report.failed,
                "Submission cycle complete",
            );
        }
        report
    }

    async fn submit_one(&self, task: &Task) -> SubmitOutcome {
        let request = GenerationRequest {
            prompt: task.prompt.clone(),
            image_size: task.image_size,
            seed: random_seed(),
            callback_url: self.config.callback_url(task.id),
        };

        let result = match &task.source_image_url {
            Some(source) => self.provider.submit_image_to_image(&request, source).await,
            None => self.provider.submit(&request).await,
        };

        let (next, outcome) = match result {
            Ok(request_id) => {
                tracing::info!(
                    task_id = %task.id,
                    request_id = %request_id,
                    seed = request.seed,
                    "Task submitted to provider",
                );
                (TaskState::Submitted { request_id }, SubmitOutcome::Submitted)
            }
            Err(e) => {
                tracing::warn!(task_id = %task.id, error = %e, "Provider submission failed");
                (
                    TaskState::Error {
                        request_id: None,
                        comment: failure_comment(&e),
                    },
                    SubmitOutcome::Failed,
                )
            }
        };

        match self
            .store
            .transition(task.id, &[TaskStatus::NotSubmitted], next)
            .await
        {
            Ok(Some(_)) => outcome,
            Ok(None) => {
                tracing::warn!(
                    task_id = %task.id,
                    "Task left not_submitted during submission, result discarded",
                );
                SubmitOutcome::Skipped
            }
            Err(e) => {
                // The task stays not_submitted and is picked up again next cycle.
                tracing::error!(task_id = %task.id, error = %e, "Failed to record submission");
                SubmitOutcome::Skipped
            }
        }
    }
}

/// Comment stored on a task whose submission failed.
pub fn failure_comment(err: &ProviderError) -> String {
    match err {
        ProviderError::Timeout => "Timeout".to_string(),
        other => other.to_string(),
    }
}

/// Uniform seed in `[0, MAX_SEED)`, drawn per submission attempt.
pub fn random_seed() -> u64 {
    rand::rng().random_range(0..MAX_SEED)
}
