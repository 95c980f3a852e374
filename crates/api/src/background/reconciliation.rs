//! Periodic reconciliation of submitted tasks with the provider.
//!
//! Backstop for lost or undeliverable webhooks.

use std::sync::Arc;
use std::time::Duration;

use imagegen_pipeline::Orchestrator;
use tokio_util::sync::CancellationToken;

/// Run a reconciliation cycle every `interval` until `cancel` is triggered.
pub async fn run(orchestrator: Arc<Orchestrator>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Reconciliation loop started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconciliation loop stopping");
                break;
            }
            _ = ticker.tick() => {
                let report = orchestrator.run_reconciliation_cycle().await;
                if report.finished > 0 || report.failed > 0 {
                    tracing::info!(
                        checked = report.checked,
                        finished = report.finished,
                        failed = report.failed,
                        "Reconciliation pass",
                    );
                }
            }
        }
    }
}
