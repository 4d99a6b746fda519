//! Conversion API handlers
//!
//! POST /api/convert, GET /api/status/:job_id

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use bb_common::events::{ConversionPhase, JobStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{ConversionResult, Job, Platform},
    services::SubmitRequest,
    AppState,
};

/// POST /api/convert request
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub source_platform: String,
    pub destination_platform: String,
    /// Playlist id or share URL
    #[serde(alias = "playlist_id")]
    pub playlist_reference: String,
    #[serde(default)]
    pub source_auth_token: Option<String>,
    #[serde(default)]
    pub destination_auth_token: Option<String>,
}

/// POST /api/convert response
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub success: bool,
    pub message: String,
    pub job_id: Uuid,
}

/// GET /api/status response
///
/// Fields present depend on `status`: `progress` while pending/processing,
/// `result` once completed, `message` once failed.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<ConversionPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ConversionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Job> for StatusResponse {
    fn from(job: Job) -> Self {
        match job.status {
            JobStatus::Pending | JobStatus::Processing => Self {
                success: true,
                status: job.status,
                progress: Some(job.progress),
                phase: Some(job.phase),
                result: None,
                message: None,
            },
            JobStatus::Completed => Self {
                success: true,
                status: job.status,
                progress: None,
                phase: None,
                result: job.result,
                message: None,
            },
            JobStatus::Failed => Self {
                success: false,
                status: job.status,
                progress: None,
                phase: None,
                result: None,
                message: Some(job.error.unwrap_or_else(|| "Conversion failed".to_string())),
            },
        }
    }
}

fn parse_platform(value: &str) -> ApiResult<Platform> {
    value
        .parse::<Platform>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// POST /api/convert
///
/// Validate the request and start a background conversion. Returns the job
/// id immediately.
pub async fn start_conversion(
    State(state): State<AppState>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> ApiResult<Json<ConvertResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if request.playlist_reference.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "playlist_reference must not be empty".to_string(),
        ));
    }

    let submit = SubmitRequest {
        source_platform: parse_platform(&request.source_platform)?,
        destination_platform: parse_platform(&request.destination_platform)?,
        playlist_reference: request.playlist_reference,
        source_auth_token: request.source_auth_token,
        destination_auth_token: request.destination_auth_token,
    };

    let job_id = state.conversions.submit(submit).await?;

    Ok(Json(ConvertResponse {
        success: true,
        message: "Conversion started".to_string(),
        job_id,
    }))
}

/// GET /api/status/:job_id
///
/// Poll a conversion job.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let job_id = Uuid::parse_str(job_id.trim())
        .map_err(|_| ApiError::NotFound(format!("Job not found: {}", job_id)))?;

    let job = state.jobs.get(job_id).await?;
    Ok(Json(StatusResponse::from(job)))
}

/// Build conversion routes
pub fn convert_routes() -> Router<AppState> {
    Router::new()
        .route("/api/convert", post(start_conversion))
        .route("/api/status/:job_id", get(get_status))
}
