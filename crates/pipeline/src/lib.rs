//! Task lifecycle orchestration.
//!
//! - [`dispatcher::SubmissionDispatcher`] hands not-yet-submitted tasks to
//!   the provider under a global concurrency cap.
//! - [`reconciler::CompletionReconciler`] finalizes submitted tasks from
//!   provider webhooks (push) or status polling (pull).
//! - [`orchestrator::Orchestrator`] composes both behind the entrypoints the
//!   HTTP layer and the scheduler call.
//! - [`queue`] carries submission triggers from intake to the worker loop.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod orchestrator;
pub mod queue;
pub mod reconciler;

#[cfg(test)]
mod testing;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use orchestrator::{Orchestrator, PipelineLoad};
