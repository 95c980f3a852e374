//! Background loops.
//!
//! Each submodule provides a long-running async function intended to be
//! spawned via `tokio::spawn`. All loops accept a [`CancellationToken`]
//! for graceful shutdown.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod reconciliation;
pub mod submission;
