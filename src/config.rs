use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::consts::{
    DEFAULT_HF_API_BASE, DEFAULT_HOST, DEFAULT_MOCK_DELAY_MS, DEFAULT_MODEL_ID, DEFAULT_PORT,
    DEFAULT_STATIC_DIR, DEFAULT_STATIC_URL_PREFIX, DEFAULT_VIDEO_SUBDIR,
    INLINE_PROVIDER_TIMEOUT_SECS, MOCK_VIDEO_FILENAME,
};
use crate::videogen::types::ApiStatus;

/// Where finished videos end up. Fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Write to the static directory and hand back a URL
    File,
    /// Base64 in the response body, nothing touches disk
    Inline,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub hf_token: Option<String>,
    pub hf_api_base: String,
    pub model_id: String,
    pub host: String,
    pub port: u16,
    pub storage_mode: StorageMode,
    pub static_dir: PathBuf,
    pub video_subdir: String,
    pub static_url_prefix: String,
    /// `0` disables the timeout even in inline mode
    #[serde(default)]
    pub provider_timeout_secs: Option<u64>,
    pub mock_delay_ms: u64,
    #[serde(default)]
    pub failure_status: Option<ApiStatus>,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    #[serde(default)]
    pub sentry_dsn: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hf_token: None,
            hf_api_base: DEFAULT_HF_API_BASE.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            storage_mode: StorageMode::File,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            video_subdir: DEFAULT_VIDEO_SUBDIR.to_string(),
            static_url_prefix: DEFAULT_STATIC_URL_PREFIX.to_string(),
            provider_timeout_secs: None,
            mock_delay_ms: DEFAULT_MOCK_DELAY_MS,
            failure_status: None,
            cors_allowed_origins: Vec::new(),
            sentry_dsn: None,
        }
    }
}

impl AppConfig {
    /// Defaults, then `videogen.toml` if present, then the process environment
    /// (unprefixed, so `HF_TOKEN` lands on `hf_token`).
    pub fn load() -> Result<Self> {
        let conf = Config::builder()
            .set_default("hf_api_base", DEFAULT_HF_API_BASE)?
            .set_default("model_id", DEFAULT_MODEL_ID)?
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", DEFAULT_PORT as i64)?
            .set_default("storage_mode", "file")?
            .set_default("static_dir", DEFAULT_STATIC_DIR)?
            .set_default("video_subdir", DEFAULT_VIDEO_SUBDIR)?
            .set_default("static_url_prefix", DEFAULT_STATIC_URL_PREFIX)?
            .set_default("mock_delay_ms", DEFAULT_MOCK_DELAY_MS as i64)?
            .add_source(File::with_name("videogen").required(false))
            .add_source(
                Environment::default()
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_allowed_origins"),
            )
            .build()
            .context("Failed to build configuration")?;

        conf.try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// The provider credential, if one is actually usable
    pub fn hf_token(&self) -> Option<&str> {
        self.hf_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn provider_timeout(&self) -> Option<Duration> {
        let secs = match (self.provider_timeout_secs, self.storage_mode) {
            (Some(0), _) => return None,
            (Some(secs), _) => secs,
            (None, StorageMode::Inline) => INLINE_PROVIDER_TIMEOUT_SECS,
            (None, StorageMode::File) => return None,
        };
        Some(Duration::from_secs(secs))
    }

    /// How a failed generation is reported by the generate endpoint.
    ///
    /// The persistent server historically answered `processing` and the
    /// serverless handler answered `error`; each mode keeps its own default.
    pub fn failure_status(&self) -> ApiStatus {
        self.failure_status.unwrap_or(match self.storage_mode {
            StorageMode::File => ApiStatus::Processing,
            StorageMode::Inline => ApiStatus::Error,
        })
    }

    pub fn mock_delay(&self) -> Duration {
        Duration::from_millis(self.mock_delay_ms)
    }

    pub fn video_dir(&self) -> PathBuf {
        self.static_dir.join(&self.video_subdir)
    }

    /// URL prefix under which generated videos are retrievable
    pub fn video_url_prefix(&self) -> String {
        format!(
            "{}/{}",
            self.static_url_prefix.trim_end_matches('/'),
            self.video_subdir
        )
    }

    pub fn mock_video_url(&self) -> String {
        format!("{}/{}", self.video_url_prefix(), MOCK_VIDEO_FILENAME)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}

/// Short, log-safe preview of a credential
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return format!("***({} chars)", chars.len());
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{head}...{tail} ({} chars)", chars.len())
}
