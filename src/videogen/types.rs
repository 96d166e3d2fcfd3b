use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::task_store::VideoRef;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct VideoGenRequest {
    pub prompt: String,
    /// Requested clip length in seconds. The model renders a fixed length,
    /// so any integer is accepted and none is honored.
    #[serde(default)]
    pub duration: Option<i64>,
}

/// Tri-state status exposed to clients
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Success,
    Processing,
    Error,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct VideoGenResponse {
    pub status: ApiStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Base64 video, inline mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub message: String,
    /// Effective clip length in seconds, when a real model produced the video
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

impl VideoGenResponse {
    pub fn new(status: ApiStatus, task_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            video_url: None,
            video_data: None,
            task_id,
            message: message.into(),
            duration: None,
        }
    }

    pub fn with_video(mut self, video: VideoRef) -> Self {
        match video {
            VideoRef::Url(url) => self.video_url = Some(url),
            VideoRef::Inline(data) => self.video_data = Some(data),
        }
        self
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ServiceInfoResponse {
    pub message: String,
    pub status: String,
}

#[derive(Error, Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(tag = "error", content = "detail")]
pub enum VideoGenError {
    #[error("{0}")]
    InvalidInput(String),
    /// No credential configured; the generator falls back to the mock.
    #[error("provider credentials are not configured")]
    ProviderUnavailable,
    #[error("Video generation timed out after {0}s. Try a shorter/simpler prompt.")]
    ProviderTimeout(u64),
    #[error("{0}")]
    ProviderMalformedResponse(String),
    #[error("{0}")]
    ProviderError(String),
    #[error("{0}")]
    Internal(String),
}

impl VideoGenError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            VideoGenError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            VideoGenError::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            VideoGenError::ProviderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            VideoGenError::ProviderMalformedResponse(_) | VideoGenError::ProviderError(_) => {
                StatusCode::BAD_GATEWAY
            }
            VideoGenError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
