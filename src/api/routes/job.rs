//! Job handlers: state, analyze, format selection, download, reset.

use super::{AnalyzeRequest, AnalyzeResponse, SelectFormatRequest};
use crate::api::AppState;
use crate::error::Result;
use crate::types::JobState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /job - Current job state
#[utoipa::path(
    get,
    path = "/api/v1/job",
    tag = "job",
    responses(
        (status = 200, description = "Current job state", body = JobState)
    )
)]
pub async fn get_job(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.machine.snapshot())
}

/// POST /job/analyze - Submit a link for analysis
#[utoipa::path(
    post,
    path = "/api/v1/job/analyze",
    tag = "job",
    request_body = AnalyzeRequest,
    responses(
        (status = 202, description = "Link accepted, analysis started", body = AnalyzeResponse),
        (status = 400, description = "Link rejected by the URL check", body = crate::error::ApiError),
        (status = 409, description = "A job is busy or finished", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn analyze_job(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Response> {
    let id = state.machine.analyze(&request.url).await?;
    Ok((StatusCode::ACCEPTED, Json(AnalyzeResponse { id })).into_response())
}

/// PUT /job/format - Select a format
#[utoipa::path(
    put,
    path = "/api/v1/job/format",
    tag = "job",
    request_body = SelectFormatRequest,
    responses(
        (status = 200, description = "Format selected", body = JobState),
        (status = 400, description = "Not a catalog id", body = crate::error::ApiError),
        (status = 409, description = "Format is locked in the current status", body = crate::error::ApiError)
    )
)]
pub async fn select_format(
    State(state): State<AppState>,
    Json(request): Json<SelectFormatRequest>,
) -> Result<Json<JobState>> {
    state.machine.select_format(&request.format).await?;
    Ok(Json(state.machine.snapshot()))
}

/// POST /job/download - Start the simulated download
///
/// Without a selected format this returns the unchanged ready state.
#[utoipa::path(
    post,
    path = "/api/v1/job/download",
    tag = "job",
    responses(
        (status = 202, description = "Download started (or nothing to do)", body = JobState),
        (status = 401, description = "Identity required but no user signed in", body = crate::error::ApiError),
        (status = 409, description = "Job is not ready", body = crate::error::ApiError),
        (status = 500, description = "Job record could not be written", body = crate::error::ApiError)
    )
)]
pub async fn start_download(State(state): State<AppState>) -> Result<Response> {
    state.machine.download().await?;
    Ok((StatusCode::ACCEPTED, Json(state.machine.snapshot())).into_response())
}

/// POST /job/reset - Return to idle
#[utoipa::path(
    post,
    path = "/api/v1/job/reset",
    tag = "job",
    responses(
        (status = 200, description = "Machine is idle", body = JobState),
        (status = 409, description = "Job is analyzing or downloading", body = crate::error::ApiError)
    )
)]
pub async fn reset_job(State(state): State<AppState>) -> Result<Json<JobState>> {
    state.machine.reset().await?;
    Ok(Json(state.machine.snapshot()))
}
