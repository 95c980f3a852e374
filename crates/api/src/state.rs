use std::sync::Arc;

use imagegen_pipeline::Orchestrator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Task lifecycle entry points (intake, lookup, webhook, cycles).
    pub orchestrator: Arc<Orchestrator>,
    /// Server configuration (access token, timeouts).
    pub config: Arc<ServerConfig>,
}
