//! Request extractors.
//!
//! - [`auth::AccessToken`] -- Requires the shared `access-token` header.

pub mod auth;
