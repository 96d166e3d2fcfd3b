use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::generator::{GenerationOutcome, GenerationResult, TaskProjection};
use super::types::{
    ApiStatus, HealthResponse, ServiceInfoResponse, VideoGenError, VideoGenRequest,
    VideoGenResponse,
};
use crate::app_state::AppState;
use crate::consts::SERVICE_NAME;

/// Maps a finished generation to the wire response.
///
/// `failure_status` decides whether a failed generation is reported as
/// `error` or as `processing` (see `AppConfig::failure_status`).
pub fn build_generation_response(
    outcome: GenerationOutcome,
    failure_status: ApiStatus,
) -> VideoGenResponse {
    match outcome.result {
        GenerationResult::Success(video) => {
            let mut response =
                VideoGenResponse::new(ApiStatus::Success, Some(outcome.task_id), outcome.message)
                    .with_video(video);
            response.duration = outcome.duration;
            response
        }
        GenerationResult::Failed(reason) => match failure_status {
            ApiStatus::Processing => VideoGenResponse::new(
                ApiStatus::Processing,
                Some(outcome.task_id),
                "Video generation in progress. Check status with task ID.",
            ),
            _ => VideoGenResponse::new(ApiStatus::Error, Some(outcome.task_id), reason),
        },
    }
}

impl From<TaskProjection> for VideoGenResponse {
    fn from(projection: TaskProjection) -> Self {
        let response =
            VideoGenResponse::new(projection.status, projection.task_id, projection.message);
        match projection.video {
            Some(video) => response.with_video(video),
            None => response,
        }
    }
}

/// Generate a video from a text prompt
#[utoipa::path(
    post,
    path = "/generate-video",
    request_body = VideoGenRequest,
    responses(
        (status = 200, description = "Generation finished (see status)", body = VideoGenResponse),
        (status = 400, description = "Invalid prompt", body = VideoGenError),
        (status = 500, description = "Video generation failed", body = VideoGenError),
    ),
    tag = "VideoGen"
)]
#[instrument(skip(state, request))]
pub async fn generate_video(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VideoGenRequest>,
) -> Result<Json<VideoGenResponse>, (StatusCode, Json<VideoGenError>)> {
    log::info!("Received video generation request: {}", request.prompt);

    let outcome = state
        .generator
        .submit(&request.prompt, request.duration)
        .await
        .map_err(|e| {
            let err = match e {
                VideoGenError::InvalidInput(_) => e,
                other => {
                    log::error!("Error generating video: {other}");
                    VideoGenError::Internal(format!("Video generation failed: {other}"))
                }
            };
            (err.status_code(), Json(err))
        })?;

    log::info!(
        "Generation {} finished via {:?}",
        outcome.task_id,
        outcome.provider
    );

    Ok(Json(build_generation_response(
        outcome,
        state.config.failure_status(),
    )))
}

/// Check the status of a video generation task
#[utoipa::path(
    get,
    path = "/video-status/{task_id}",
    params(
        ("task_id" = String, Path, description = "Task id returned by generate-video")
    ),
    responses(
        (status = 200, description = "Task projection; unknown ids report status error", body = VideoGenResponse),
    ),
    tag = "VideoGen"
)]
#[instrument(skip(state))]
pub async fn get_video_status(
    Path(task_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Json<VideoGenResponse> {
    Json(state.generator.get_status(&task_id).await.into())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse),
    ),
    tag = "VideoGen"
)]
#[instrument]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

#[instrument]
pub async fn service_info() -> Json<ServiceInfoResponse> {
    Json(ServiceInfoResponse {
        message: SERVICE_NAME.to_string(),
        status: "running".to_string(),
    })
}
