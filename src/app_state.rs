use crate::config::{mask_token, AppConfig, StorageMode};
use crate::videogen::{TaskStore, VideoGenerator};
use anyhow::{Context, Result};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub generator: VideoGenerator,
}

impl AppState {
    pub async fn new(app_config: AppConfig) -> Result<Self> {
        log_credential_status(&app_config);

        if app_config.storage_mode == StorageMode::File {
            init_video_dir(&app_config).await?;
        }

        let generator = VideoGenerator::from_config(&app_config, init_task_store());

        Ok(AppState {
            config: app_config,
            generator,
        })
    }
}

fn log_credential_status(conf: &AppConfig) {
    match conf.hf_token() {
        Some(token) => log::info!("HF_TOKEN loaded: {}", mask_token(token)),
        None => log::warn!("HF_TOKEN not set, generation requests will be served by the mock"),
    }
}

fn init_task_store() -> TaskStore {
    TaskStore::new()
}

async fn init_video_dir(conf: &AppConfig) -> Result<()> {
    let dir = conf.video_dir();
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create video directory {}", dir.display()))?;
    log::info!(
        "Serving generated videos from {} at {}",
        dir.display(),
        conf.video_url_prefix()
    );
    Ok(())
}
