use std::path::PathBuf;

use base64::Engine;
use tracing::info;

use super::task_store::VideoRef;
use super::types::VideoGenError;
use crate::config::{AppConfig, StorageMode};

/// Sink for finished videos, chosen once per deployment
#[derive(Debug, Clone)]
pub enum VideoStorage {
    File { dir: PathBuf, url_prefix: String },
    Inline,
}

impl VideoStorage {
    pub fn from_config(conf: &AppConfig) -> Self {
        match conf.storage_mode {
            StorageMode::File => VideoStorage::File {
                dir: conf.video_dir(),
                url_prefix: conf.video_url_prefix(),
            },
            StorageMode::Inline => VideoStorage::Inline,
        }
    }

    pub fn file_name(task_id: &str) -> String {
        format!("generated_video_{task_id}.mp4")
    }

    pub async fn store(&self, task_id: &str, bytes: &[u8]) -> Result<VideoRef, VideoGenError> {
        match self {
            VideoStorage::File { dir, url_prefix } => {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    VideoGenError::Internal(format!(
                        "Failed to create video directory {}: {e}",
                        dir.display()
                    ))
                })?;

                let file_name = Self::file_name(task_id);
                let path = dir.join(&file_name);
                tokio::fs::write(&path, bytes).await.map_err(|e| {
                    VideoGenError::Internal(format!(
                        "Failed to write video {}: {e}",
                        path.display()
                    ))
                })?;

                info!("Stored {} bytes at {}", bytes.len(), path.display());
                Ok(VideoRef::Url(format!("{url_prefix}/{file_name}")))
            }
            VideoStorage::Inline => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
                info!("Video encoded inline, size: {} bytes", bytes.len());
                Ok(VideoRef::Inline(encoded))
            }
        }
    }
}
