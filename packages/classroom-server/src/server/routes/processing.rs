//! Processing pipeline routes.
//!
//! Everything here is a thin adapter over the scheduler; the routes never
//! touch the stage runner or the store directly, so an on-demand trigger
//! goes through exactly the same claim gate as the background loop.

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::domains::lectures::Lecture;
use crate::domains::processing::{ProcessingError, TriggerOutcome};
use crate::server::app::AppState;

#[derive(Serialize)]
struct LectureSummary {
    id: Uuid,
    title: String,
    subject: String,
    has_transcript: bool,
    last_attempt_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<Lecture> for LectureSummary {
    fn from(lecture: Lecture) -> Self {
        Self {
            id: lecture.id,
            title: lecture.title,
            subject: lecture.subject,
            has_transcript: lecture.transcript.is_some(),
            last_attempt_at: lecture.last_attempt_at,
            created_at: lecture.created_at,
        }
    }
}

/// GET /process/status - pipeline diagnostic snapshot
pub async fn processing_status_handler(Extension(state): Extension<AppState>) -> Response {
    match state.scheduler.status().await {
        Ok(status) => (StatusCode::OK, Json(json!({ "status": "ok", "data": status })))
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to read processing status");
            internal_error("failed to read processing status")
        }
    }
}

/// POST /process/lecture/:lecture_id - synchronous on-demand processing
pub async fn trigger_processing_handler(
    Extension(state): Extension<AppState>,
    Path(lecture_id): Path<Uuid>,
) -> Response {
    match state.scheduler.run_now(lecture_id).await {
        Ok(TriggerOutcome::Completed(outcome)) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "message": "lecture processed",
                "data": outcome,
            })),
        )
            .into_response(),
        Ok(TriggerOutcome::AlreadyProcessed) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "message": "lecture already processed",
            })),
        )
            .into_response(),
        Ok(TriggerOutcome::NotEligible) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "error",
                "message": "lecture has no audio to process",
            })),
        )
            .into_response(),
        Ok(TriggerOutcome::InFlight) => (
            StatusCode::CONFLICT,
            Json(json!({
                "status": "error",
                "message": "processing already in progress for this lecture",
            })),
        )
            .into_response(),
        Err(e) => processing_error_response(lecture_id, e),
    }
}

/// GET /process/unprocessed - lectures awaiting processing
pub async fn list_unprocessed_handler(Extension(state): Extension<AppState>) -> Response {
    match state.scheduler.list_unprocessed().await {
        Ok(lectures) => {
            let summaries: Vec<LectureSummary> =
                lectures.into_iter().map(LectureSummary::from).collect();
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "data": { "count": summaries.len(), "lectures": summaries },
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to list unprocessed lectures");
            internal_error("failed to list unprocessed lectures")
        }
    }
}

/// POST /process/retry-stale - re-admit stalled processing attempts
pub async fn retry_stale_handler(Extension(state): Extension<AppState>) -> Response {
    match state.scheduler.reclaim_stale().await {
        Ok(reclaimed) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "message": "stale attempts released",
                "data": { "reclaimed": reclaimed },
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to release stale attempts");
            internal_error("failed to release stale attempts")
        }
    }
}

/// POST /process/start - start the background loop
pub async fn start_scheduler_handler(Extension(state): Extension<AppState>) -> Response {
    state.scheduler.start().await;
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "message": "processing scheduler running" })),
    )
        .into_response()
}

/// POST /process/stop - stop the background loop
pub async fn stop_scheduler_handler(Extension(state): Extension<AppState>) -> Response {
    state.scheduler.stop().await;
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "message": "processing scheduler stopped" })),
    )
        .into_response()
}

fn processing_error_response(lecture_id: Uuid, error: ProcessingError) -> Response {
    match &error {
        ProcessingError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "status": "error",
                "message": format!("lecture {} not found", lecture_id),
            })),
        )
            .into_response(),
        ProcessingError::NoAudio(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "error",
                "message": "lecture has no audio to process",
            })),
        )
            .into_response(),
        ProcessingError::Stage { stage, source } => {
            error!(lecture_id = %lecture_id, stage = %stage, error = %source, "processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": format!("{} stage failed", stage),
                    "data": { "failed_stage": stage },
                })),
            )
                .into_response()
        }
        ProcessingError::Store(e) => {
            error!(lecture_id = %lecture_id, error = %e, "processing failed to persist");
            internal_error("processing failed")
        }
    }
}

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "error", "message": message })),
    )
        .into_response()
}
