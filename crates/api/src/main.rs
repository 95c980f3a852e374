use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use imagegen_core::memory_store::MemoryTaskStore;
use imagegen_core::store::TaskStore;
use imagegen_fal::{FalClient, FalConfig};
use imagegen_pipeline::queue::submission_queue;
use imagegen_pipeline::{Orchestrator, PipelineConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imagegen_api::background;
use imagegen_api::config::ServerConfig;
use imagegen_api::router::build_app_router;
use imagegen_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "imagegen_api=debug,imagegen_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Task store ---
    let store: Arc<dyn TaskStore> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = imagegen_db::create_pool(&database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            imagegen_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            imagegen_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(imagegen_db::PgTaskStore::new(pool))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL is not set; tasks are kept in memory only");
            Arc::new(MemoryTaskStore::new())
        }
    };

    // --- Provider ---
    let fal_config = FalConfig::from_env();
    tracing::info!(
        model = %fal_config.model,
        image_to_image_model = %fal_config.image_to_image_model,
        "Loaded provider configuration",
    );
    let provider = Arc::new(FalClient::new(fal_config).expect("Failed to build provider client"));

    // --- Orchestrator ---
    let pipeline_config = PipelineConfig::from_env();
    if pipeline_config.webhook_base_url.is_none() {
        tracing::warn!("API_WEBHOOK_BASEURL is not set; results are collected by polling only");
    }
    tracing::info!(
        max_concurrent = pipeline_config.max_concurrent,
        "Loaded pipeline configuration",
    );
    let (queue, triggers) = submission_queue();
    let orchestrator =
        Arc::new(Orchestrator::new(store, provider, pipeline_config).with_queue(queue));

    // --- Background loops ---
    let cancel = CancellationToken::new();
    let handles = vec![
        tokio::spawn(background::submission::run(
            Arc::clone(&orchestrator),
            config.scheduler.submission_interval,
            cancel.clone(),
        )),
        tokio::spawn(background::submission::run_worker(
            Arc::clone(&orchestrator),
            triggers,
            cancel.clone(),
        )),
        tokio::spawn(background::reconciliation::run(
            Arc::clone(&orchestrator),
            config.scheduler.reconciliation_interval,
            cancel.clone(),
        )),
    ];
    tracing::info!("Background loops started (submission, submission worker, reconciliation)");

    // --- App state ---
    let state = AppState {
        orchestrator,
        config: Arc::new(config.clone()),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // An in-flight cycle finishes before its loop observes the cancellation.
    cancel.cancel();
    let drain = join_background(handles);
    if tokio::time::timeout(Duration::from_secs(config.shutdown_timeout_secs), drain)
        .await
        .is_err()
    {
        tracing::warn!("Background loops did not stop in time");
    }
    tracing::info!("Graceful shutdown complete");
}

/// Await every background task, logging any that panicked.
async fn join_background(handles: Vec<tokio::task::JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Background task ended abnormally");
        }
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
