//! Background pipeline runs.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use super::super::{AppState, PipelineJobStatus};

/// Start a full pipeline run in the background.
/// POST /api/pipeline
pub async fn api_run_pipeline(State(state): State<AppState>) -> Response {
    {
        let mut job = state.pipeline_job.write().await;
        if job.running {
            return (
                StatusCode::CONFLICT,
                Json(serde_json::json!({
                    "status": "busy",
                    "message": "A pipeline run is already in progress",
                    "started_at": job.started_at,
                })),
            )
                .into_response();
        }
        *job = PipelineJobStatus {
            running: true,
            started_at: Some(Utc::now()),
            ..Default::default()
        };
    }

    let job_state = state.clone();
    tokio::spawn(async move {
        let report = job_state.pipeline.run_full(None).await;

        let mut job = job_state.pipeline_job.write().await;
        job.running = false;
        job.finished_at = Some(Utc::now());
        if !report.errors.is_empty() {
            job.error = Some(report.errors.join("; "));
        }
        job.report = Some(report);
    });

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "status": "started",
            "message": "Pipeline started. Poll /api/pipeline/status for progress.",
        })),
    )
        .into_response()
}

/// GET /api/pipeline/status
pub async fn api_pipeline_status(State(state): State<AppState>) -> Json<PipelineJobStatus> {
    Json(state.pipeline_job.read().await.clone())
}
