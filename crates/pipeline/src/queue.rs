//! Submission triggers.
//!
//! Intake notifies the queue after persisting a task so the submission
//! worker runs a cycle without waiting for the next scheduler tick. The
//! channel carries no payload: one pending trigger already covers every
//! task created before the worker wakes up.

use tokio::sync::mpsc;

/// Pending triggers held at once. Further notifications coalesce.
pub const QUEUE_CAPACITY: usize = 1;

/// Sending half, held by the orchestrator.
#[derive(Debug, Clone)]
pub struct SubmissionQueue {
    tx: mpsc::Sender<()>,
}

/// Receiving half, consumed by the submission worker.
#[derive(Debug)]
pub struct SubmissionTriggers {
    rx: mpsc::Receiver<()>,
}

/// Create a connected queue and trigger receiver.
pub fn submission_queue() -> (SubmissionQueue, SubmissionTriggers) {
    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    (SubmissionQueue { tx }, SubmissionTriggers { rx })
}

impl SubmissionQueue {
    /// Request a submission cycle. Never blocks.
    ///
    /// Returns `false` once the worker has gone away.
    pub fn try_notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}

impl SubmissionTriggers {
    /// Wait for the next trigger. `None` once every sender is dropped.
    pub async fn next(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notifications_coalesce() {
        let (queue, mut triggers) = submission_queue();
        assert!(queue.try_notify());
        assert!(queue.try_notify());
        assert!(queue.try_notify());

        assert_eq!(triggers.next().await, Some(()));
        assert!(triggers.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn notify_reports_closed_worker() {
        let (queue, triggers) = submission_queue();
        drop(triggers);
        assert!(!queue.try_notify());
    }

    #[tokio::test]
    async fn triggers_end_when_senders_drop() {
        let (queue, mut triggers) = submission_queue();
        drop(queue);
        assert_eq!(triggers.next().await, None);
    }
}
