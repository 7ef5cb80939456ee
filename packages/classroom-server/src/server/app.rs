//! Application setup and server configuration.

use axum::{
    Router,
    extract::Extension,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domains::processing::Scheduler;
use crate::server::routes::{
    health_handler, list_unprocessed_handler, processing_status_handler, retry_stale_handler,
    start_scheduler_handler, stop_scheduler_handler, trigger_processing_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub scheduler: Scheduler,
}

/// Build the Axum application router
pub fn build_app(pool: PgPool, scheduler: Scheduler) -> Router {
    let app_state = AppState {
        db_pool: pool,
        scheduler,
    };

    // CORS configuration - allow any origin for development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/process/status", get(processing_status_handler))
        .route(
            "/process/lecture/:lecture_id",
            post(trigger_processing_handler),
        )
        .route("/process/unprocessed", get(list_unprocessed_handler))
        .route("/process/retry-stale", post(retry_stale_handler))
        .route("/process/start", post(start_scheduler_handler))
        .route("/process/stop", post(stop_scheduler_handler))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
