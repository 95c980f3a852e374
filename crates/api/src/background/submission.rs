//! Submission scheduling.
//!
//! Two producers drive the dispatcher: a fixed interval and the intake
//! queue. Both end up in [`Orchestrator::run_submission_cycle`], which
//! serializes overlapping calls.

use std::sync::Arc;
use std::time::Duration;

use imagegen_pipeline::queue::SubmissionTriggers;
use imagegen_pipeline::Orchestrator;
use tokio_util::sync::CancellationToken;

/// Run a submission cycle every `interval` until `cancel` is triggered.
pub async fn run(orchestrator: Arc<Orchestrator>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Submission loop started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Submission loop stopping");
                break;
            }
            _ = ticker.tick() => {
                orchestrator.run_submission_cycle().await;
            }
        }
    }
}

/// Run a submission cycle for every intake trigger until `cancel` is
/// triggered or every queue handle is dropped.
pub async fn run_worker(
    orchestrator: Arc<Orchestrator>,
    mut triggers: SubmissionTriggers,
    cancel: CancellationToken,
) {
    tracing::info!("Submission worker started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Submission worker stopping");
                break;
            }
            trigger = triggers.next() => {
                if trigger.is_none() {
                    tracing::info!("Submission queue closed, worker stopping");
                    break;
                }
                orchestrator.run_submission_cycle().await;
            }
        }
    }
}
