pub const SERVICE_NAME: &str = "AI Video Generation API";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_HF_API_BASE: &str = "https://router.huggingface.co/hf-inference";
pub const DEFAULT_MODEL_ID: &str = "Wan-AI/Wan2.2-T2V-A14B";

/// Wan 2.2 T2V renders a fixed clip; requested durations are not forwarded.
pub const MODEL_DURATION_SECS: u32 = 5;
pub const MODEL_NUM_FRAMES: u32 = 120;
pub const MODEL_FPS: u32 = 24;

pub const MIN_PROMPT_CHARS: usize = 3;

/// Upper bound on the provider call in inline (serverless) mode
pub const INLINE_PROVIDER_TIMEOUT_SECS: u64 = 240;

pub const DEFAULT_MOCK_DELAY_MS: u64 = 3_000;
pub const MOCK_VIDEO_FILENAME: &str = "mock_video.mp4";

pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_VIDEO_SUBDIR: &str = "generated_videos";
pub const DEFAULT_STATIC_URL_PREFIX: &str = "/video-static";

pub const REQUEST_BODY_LIMIT: usize = 1024 * 1024; // 1MB, prompts only
