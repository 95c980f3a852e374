//! Liveness and capacity report, mounted at the root rather than `/api/v1`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the task store is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub store_healthy: bool,
    /// Tasks currently generating at the provider; absent when degraded.
    pub generating: Option<i64>,
    pub max_concurrent: Option<usize>,
}

/// GET /health
///
/// Answers 503 when the store cannot be reached so load balancers stop
/// routing to this instance.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.orchestrator.load().await {
        Ok(load) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
                store_healthy: true,
                generating: Some(load.generating),
                max_concurrent: Some(load.max_concurrent),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Task store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    version: env!("CARGO_PKG_VERSION"),
                    store_healthy: false,
                    generating: None,
                    max_concurrent: None,
                }),
            )
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
