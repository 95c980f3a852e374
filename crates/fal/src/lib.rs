//! fal.ai queue API client.
//!
//! Implements [`imagegen_core::provider::ImageProvider`] over the fal REST
//! queue (submit, status, result) and storage upload endpoints using
//! [`reqwest`].

pub mod client;
pub mod config;
pub mod messages;

pub use client::FalClient;
pub use config::{FalConfig, FalConfigError};
