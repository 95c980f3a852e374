//! Domain types and collaborator contracts for the image generation service.
//!
//! This crate has zero internal dependencies. It defines the task state
//! machine, input validation, the [`store::TaskStore`] and
//! [`provider::ImageProvider`] traits, and an in-memory store used by tests
//! and database-less local runs.

pub mod error;
pub mod memory_store;
pub mod provider;
pub mod store;
pub mod task;
pub mod types;
