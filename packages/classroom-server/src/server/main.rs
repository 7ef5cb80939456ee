// Main entry point for the classroom assistant API server

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use classroom_core::domains::processing::{PgLectureStore, Scheduler, SchedulerConfig, StageRunner};
use classroom_core::kernel::PipelineDeps;
use classroom_core::server::build_app;
use classroom_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,classroom_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Classroom Assistant API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    // Wire the processing pipeline
    let store = Arc::new(PgLectureStore::new(pool.clone()));
    let deps = PipelineDeps::from_config(store.clone(), &config);
    let runner = StageRunner::new(deps);
    let scheduler = Scheduler::new(
        store,
        runner,
        SchedulerConfig {
            poll_interval: Duration::from_secs(config.processing_interval_secs),
            batch_size: config.processing_batch_size,
            staleness_window: chrono::Duration::seconds(config.staleness_window_secs),
        },
    );
    scheduler.start().await;

    // Build application
    let app = build_app(pool, scheduler.clone());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Let an in-progress processing attempt finish before exiting.
    scheduler.stop().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
