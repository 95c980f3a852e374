//! Row structs and status lookups.

pub mod status;
pub mod task;
