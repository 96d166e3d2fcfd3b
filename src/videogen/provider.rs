use std::fmt;
use std::io::Read;
use std::path::PathBuf;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::types::VideoGenError;
use crate::config::AppConfig;
use crate::consts::{MODEL_DURATION_SECS, MODEL_FPS, MODEL_NUM_FRAMES};

/// Byte payload tagged with the MIME type the provider reported
#[derive(Debug, Clone)]
pub struct VideoContent {
    pub content: Vec<u8>,
    pub content_type: Option<String>,
}

/// Every shape a provider may hand back for a finished video
pub enum ProviderOutput {
    Bytes(Vec<u8>),
    Content(VideoContent),
    /// Blocking reader, drained on the blocking pool
    Reader(Box<dyn Read + Send>),
    /// A file the provider wrote locally
    Path(PathBuf),
}

impl fmt::Debug for ProviderOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderOutput::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            ProviderOutput::Content(c) => write!(
                f,
                "Content({} bytes, {:?})",
                c.content.len(),
                c.content_type
            ),
            ProviderOutput::Reader(_) => write!(f, "Reader(..)"),
            ProviderOutput::Path(path) => write!(f, "Path({})", path.display()),
        }
    }
}

impl ProviderOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderOutput::Bytes(_) => "bytes",
            ProviderOutput::Content(_) => "content",
            ProviderOutput::Reader(_) => "reader",
            ProviderOutput::Path(_) => "path",
        }
    }

    /// Normalizes any payload shape to the raw video bytes
    pub async fn into_bytes(self) -> Result<Vec<u8>, VideoGenError> {
        match self {
            ProviderOutput::Bytes(bytes) => Ok(bytes),
            ProviderOutput::Content(content) => Ok(content.content),
            ProviderOutput::Reader(mut reader) => tokio::task::spawn_blocking(move || {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).map(|_| buf)
            })
            .await
            .map_err(|e| VideoGenError::Internal(format!("Reader task failed: {e}")))?
            .map_err(|e| {
                VideoGenError::ProviderMalformedResponse(format!(
                    "Failed to read video stream from provider: {e}"
                ))
            }),
            ProviderOutput::Path(path) => {
                let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
                if !exists {
                    return Err(VideoGenError::ProviderMalformedResponse(format!(
                        "Provider returned a path that does not exist: {}",
                        path.display()
                    )));
                }
                tokio::fs::read(&path).await.map_err(|e| {
                    VideoGenError::ProviderMalformedResponse(format!(
                        "Failed to read provider output {}: {e}",
                        path.display()
                    ))
                })
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub prompt: String,
    pub model_id: String,
    pub num_frames: u32,
}

impl ProviderRequest {
    pub fn new(prompt: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model_id: model_id.into(),
            num_frames: MODEL_NUM_FRAMES,
        }
    }
}

/// A remote text-to-video backend.
///
/// The returned future owns everything it needs so it can run on its own task.
pub trait TextToVideoProvider: Send + Sync {
    fn text_to_video(
        &self,
        request: ProviderRequest,
    ) -> BoxFuture<'static, Result<ProviderOutput, VideoGenError>>;
}

#[derive(Serialize)]
struct HfTextToVideoRequest {
    inputs: String,
    parameters: HfTextToVideoParameters,
}

#[derive(Serialize)]
struct HfTextToVideoParameters {
    num_frames: u32,
}

#[derive(Deserialize)]
struct HfErrorResponse {
    error: serde_json::Value,
}

/// Hugging Face Inference client for text-to-video models
#[derive(Clone)]
pub struct HuggingFaceClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl HuggingFaceClient {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            token: token.into(),
        }
    }

    /// Client for the configured deployment, or `ProviderUnavailable` when no
    /// credential is set.
    pub fn from_config(conf: &AppConfig) -> Result<Self, VideoGenError> {
        let token = conf.hf_token().ok_or(VideoGenError::ProviderUnavailable)?;
        Ok(Self::new(&conf.hf_api_base, token))
    }

    fn model_url(&self, model_id: &str) -> String {
        format!("{}/models/{}", self.api_base.trim_end_matches('/'), model_id)
    }

    async fn generate(
        client: reqwest::Client,
        url: String,
        token: String,
        request: ProviderRequest,
    ) -> Result<ProviderOutput, VideoGenError> {
        info!(
            "Submitting text-to-video request to {} for prompt: {}",
            url,
            request.prompt.chars().take(60).collect::<String>()
        );

        let body = HfTextToVideoRequest {
            inputs: request.prompt,
            parameters: HfTextToVideoParameters {
                num_frames: request.num_frames,
            },
        };

        let response = client
            .post(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to reach Hugging Face: {}", e);
                VideoGenError::ProviderError(format!("Hugging Face API error: {e}"))
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Hugging Face API error: {} - {}", status, error_text);

            let detail = parse_error_detail(&error_text).unwrap_or(error_text);
            return Err(VideoGenError::ProviderError(format!(
                "Hugging Face API error: {status} - {detail}"
            )));
        }

        let content = response.bytes().await.map_err(|e| {
            error!("Failed to read Hugging Face response body: {}", e);
            VideoGenError::ProviderError(format!("Hugging Face API error: {e}"))
        })?;

        if content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("json"))
        {
            let text = String::from_utf8_lossy(&content);
            return Err(match parse_error_detail(&text) {
                Some(detail) => {
                    VideoGenError::ProviderError(format!("Hugging Face API error: {detail}"))
                }
                None => VideoGenError::ProviderMalformedResponse(
                    "Provider returned JSON instead of video content".to_string(),
                ),
            });
        }

        Ok(ProviderOutput::Content(VideoContent {
            content: content.to_vec(),
            content_type,
        }))
    }
}

impl TextToVideoProvider for HuggingFaceClient {
    fn text_to_video(
        &self,
        request: ProviderRequest,
    ) -> BoxFuture<'static, Result<ProviderOutput, VideoGenError>> {
        let url = self.model_url(&request.model_id);
        Self::generate(self.client.clone(), url, self.token.clone(), request).boxed()
    }
}

fn parse_error_detail(body: &str) -> Option<String> {
    let parsed: HfErrorResponse = serde_json::from_str(body).ok()?;
    match parsed.error {
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Adds a hint when a provider failure looks like the model refusing the
/// requested length rather than a generic outage.
pub fn annotate_capability_error(message: &str, model_id: &str) -> String {
    let lower = message.to_lowercase();
    if lower.contains("frame") || lower.contains("duration") {
        format!(
            "{message} (likely a model limitation: {model_id} only renders \
             {MODEL_DURATION_SECS}s clips of {MODEL_NUM_FRAMES} frames at {MODEL_FPS} fps)"
        )
    } else {
        message.to_string()
    }
}
