use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::provider::{
    annotate_capability_error, HuggingFaceClient, ProviderRequest, TextToVideoProvider,
};
use super::storage::VideoStorage;
use super::task_store::{GenerationTask, ProviderKind, TaskStatus, TaskStore, VideoRef};
use super::types::{ApiStatus, VideoGenError};
use crate::config::AppConfig;
use crate::consts::{MIN_PROMPT_CHARS, MODEL_DURATION_SECS};

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Success(VideoRef),
    Failed(String),
}

/// What `submit` hands back once the task reached a terminal state
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub task_id: String,
    pub provider: ProviderKind,
    pub result: GenerationResult,
    pub message: String,
    /// Clip length the model actually renders
    pub duration: Option<u32>,
}

/// Client-facing view of a task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskProjection {
    pub status: ApiStatus,
    pub task_id: Option<String>,
    pub video: Option<VideoRef>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub model_id: String,
    /// Single cancellation point for the provider call
    pub timeout: Option<Duration>,
    pub mock_delay: Duration,
    pub mock_video_url: String,
}

impl GeneratorSettings {
    pub fn from_config(conf: &AppConfig) -> Self {
        Self {
            model_id: conf.model_id.clone(),
            timeout: conf.provider_timeout(),
            mock_delay: conf.mock_delay(),
            mock_video_url: conf.mock_video_url(),
        }
    }
}

pub fn validate_prompt(prompt: &str) -> Result<(), VideoGenError> {
    if prompt.trim().chars().count() < MIN_PROMPT_CHARS {
        return Err(VideoGenError::InvalidInput(format!(
            "Prompt must be at least {MIN_PROMPT_CHARS} characters long"
        )));
    }
    Ok(())
}

/// Runs generations against the provider (or the mock when no credential is
/// configured) and records every attempt in the task store.
#[derive(Clone)]
pub struct VideoGenerator {
    tasks: TaskStore,
    provider: Option<Arc<dyn TextToVideoProvider>>,
    storage: VideoStorage,
    settings: GeneratorSettings,
}

impl VideoGenerator {
    pub fn new(
        tasks: TaskStore,
        provider: Option<Arc<dyn TextToVideoProvider>>,
        storage: VideoStorage,
        settings: GeneratorSettings,
    ) -> Self {
        Self {
            tasks,
            provider,
            storage,
            settings,
        }
    }

    pub fn from_config(conf: &AppConfig, tasks: TaskStore) -> Self {
        let provider: Option<Arc<dyn TextToVideoProvider>> =
            match HuggingFaceClient::from_config(conf) {
                Ok(client) => {
                    info!(
                        "Hugging Face client initialized for model {}",
                        conf.model_id
                    );
                    Some(Arc::new(client))
                }
                Err(e) => {
                    warn!("{}, will use mock generation", e);
                    None
                }
            };

        Self::new(
            tasks,
            provider,
            VideoStorage::from_config(conf),
            GeneratorSettings::from_config(conf),
        )
    }

    pub fn provider_kind(&self) -> ProviderKind {
        if self.provider.is_some() {
            ProviderKind::HuggingFace
        } else {
            ProviderKind::Mock
        }
    }

    /// Validates the prompt, allocates a task id and drives the task to a
    /// terminal state.
    ///
    /// Provider failures are not errors here: they come back as
    /// `GenerationResult::Failed`. `Err` is reserved for invalid input and
    /// internal faults.
    #[instrument(skip(self, prompt))]
    pub async fn submit(
        &self,
        prompt: &str,
        duration: Option<i64>,
    ) -> Result<GenerationOutcome, VideoGenError> {
        validate_prompt(prompt)?;

        let task_id = Uuid::new_v4().to_string();

        match &self.provider {
            Some(provider) => {
                self.generate_with_provider(provider.clone(), prompt, duration, task_id)
                    .await
            }
            None => self.mock_generation(prompt, task_id).await,
        }
    }

    async fn mock_generation(
        &self,
        prompt: &str,
        task_id: String,
    ) -> Result<GenerationOutcome, VideoGenError> {
        info!("Using mock video generation (no HF_TOKEN provided)");

        self.tasks
            .insert(GenerationTask::processing(
                task_id.clone(),
                ProviderKind::Mock,
                prompt.to_string(),
            ))
            .await?;

        // Detached like the provider lifecycle, so a dropped request still
        // leaves a completed task behind.
        let video = VideoRef::Url(self.settings.mock_video_url.clone());
        let tasks = self.tasks.clone();
        let delay = self.settings.mock_delay;
        let lifecycle_id = task_id.clone();
        let lifecycle_video = video.clone();
        let lifecycle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tasks.complete(&lifecycle_id, lifecycle_video).await
        });

        match lifecycle.await {
            Ok(completed) => completed?,
            Err(e) => return Err(self.abandon_task(&task_id, e).await),
        }

        Ok(GenerationOutcome {
            task_id,
            provider: ProviderKind::Mock,
            result: GenerationResult::Success(video),
            message: "Mock video generated (add HF_TOKEN for real generation)".to_string(),
            duration: None,
        })
    }

    async fn generate_with_provider(
        &self,
        provider: Arc<dyn TextToVideoProvider>,
        prompt: &str,
        duration: Option<i64>,
        task_id: String,
    ) -> Result<GenerationOutcome, VideoGenError> {
        info!("Starting Hugging Face video generation with prompt: {}", prompt);

        self.tasks
            .insert(GenerationTask::processing(
                task_id.clone(),
                ProviderKind::HuggingFace,
                prompt.to_string(),
            ))
            .await?;
        info!("Task {} registered", task_id);

        let ignored_duration = duration.filter(|d| *d != i64::from(MODEL_DURATION_SECS));
        if let Some(requested) = ignored_duration {
            warn!(
                "Requested duration {}s ignored, {} renders {}s clips",
                requested, self.settings.model_id, MODEL_DURATION_SECS
            );
        }

        // The lifecycle runs detached so the task still resolves if the
        // client goes away mid-request.
        let request = ProviderRequest::new(prompt, &self.settings.model_id);
        let generator = self.clone();
        let lifecycle_id = task_id.clone();
        let lifecycle = tokio::spawn(async move {
            generator
                .run_provider_call(provider, request, lifecycle_id)
                .await
        });

        let result = match lifecycle.await {
            Ok(result) => result?,
            Err(e) => return Err(self.abandon_task(&task_id, e).await),
        };

        let (message, duration) = match &result {
            GenerationResult::Success(_) => {
                let mut message = "Video generated successfully using Hugging Face".to_string();
                if let Some(requested) = ignored_duration {
                    message.push_str(&format!(
                        " (duration fixed at {MODEL_DURATION_SECS}s by the model; requested {requested}s was ignored)"
                    ));
                }
                (message, Some(MODEL_DURATION_SECS))
            }
            GenerationResult::Failed(reason) => (reason.clone(), None),
        };

        Ok(GenerationOutcome {
            task_id,
            provider: ProviderKind::HuggingFace,
            result,
            message,
            duration,
        })
    }

    async fn run_provider_call(
        &self,
        provider: Arc<dyn TextToVideoProvider>,
        request: ProviderRequest,
        task_id: String,
    ) -> Result<GenerationResult, VideoGenError> {
        let mut worker = tokio::spawn(provider.text_to_video(request));

        let joined = match self.settings.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut worker).await {
                Ok(joined) => joined,
                Err(_) => {
                    worker.abort();
                    warn!("Provider call for task {} exceeded {:?}", task_id, limit);
                    return self
                        .fail_task(&task_id, VideoGenError::ProviderTimeout(limit.as_secs()))
                        .await;
                }
            },
            None => worker.await,
        };

        let output = match joined {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return self.fail_task(&task_id, e).await,
            Err(e) => {
                let err = VideoGenError::Internal(format!("Provider worker failed: {e}"));
                self.fail_task(&task_id, err.clone()).await?;
                return Err(err);
            }
        };

        info!(
            "Video generation completed for task {}, payload shape: {}",
            task_id,
            output.kind()
        );

        let bytes = match output.into_bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return self.fail_task(&task_id, e).await,
        };

        if bytes.is_empty() {
            return self
                .fail_task(
                    &task_id,
                    VideoGenError::ProviderMalformedResponse(
                        "No video content received from AI model".to_string(),
                    ),
                )
                .await;
        }

        let video = match self.storage.store(&task_id, &bytes).await {
            Ok(video) => video,
            Err(e) => return self.fail_task(&task_id, e).await,
        };

        self.tasks.complete(&task_id, video.clone()).await?;
        info!("Video generated successfully for task {}", task_id);

        Ok(GenerationResult::Success(video))
    }

    /// Records a lifecycle that died without resolving its task.
    async fn abandon_task(&self, task_id: &str, e: tokio::task::JoinError) -> VideoGenError {
        let err = VideoGenError::Internal(format!("Generation task aborted: {e}"));
        if let Err(store_err) = self.tasks.fail(task_id, err.to_string()).await {
            error!("Failed to record aborted task {}: {}", task_id, store_err);
        }
        err
    }

    async fn fail_task(
        &self,
        task_id: &str,
        err: VideoGenError,
    ) -> Result<GenerationResult, VideoGenError> {
        let message = match &err {
            VideoGenError::ProviderError(msg) => {
                annotate_capability_error(msg, &self.settings.model_id)
            }
            other => other.to_string(),
        };

        error!("Generation for task {} failed: {}", task_id, message);
        self.tasks.fail(task_id, message.clone()).await?;

        Ok(GenerationResult::Failed(message))
    }

    /// Pure read of a task's state. Unknown ids are reported, never raised.
    pub async fn get_status(&self, task_id: &str) -> TaskProjection {
        let Some(task) = self.tasks.get(task_id).await else {
            return TaskProjection {
                status: ApiStatus::Error,
                task_id: None,
                video: None,
                message: "Task not found".to_string(),
            };
        };

        match task.status {
            TaskStatus::Completed => TaskProjection {
                status: ApiStatus::Success,
                task_id: Some(task.id),
                video: task.video,
                message: "Video generation completed".to_string(),
            },
            TaskStatus::Processing => TaskProjection {
                status: ApiStatus::Processing,
                task_id: Some(task.id),
                video: None,
                message: "Video is still being generated...".to_string(),
            },
            TaskStatus::Failed => TaskProjection {
                status: ApiStatus::Error,
                task_id: Some(task.id),
                video: None,
                message: task
                    .error
                    .unwrap_or_else(|| "Video generation failed".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::videogen::provider::{ProviderOutput, VideoContent};
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::io::Cursor;
    use std::path::PathBuf;

    const VIDEO: &[u8] = b"\x00\x00\x00\x18ftypmp42generated";

    type MakeOutput = Arc<dyn Fn() -> ProviderOutput + Send + Sync>;

    enum Script {
        Output(MakeOutput),
        Fail(String),
        Hang,
        Panic,
    }

    struct ScriptedProvider {
        script: Script,
    }

    impl TextToVideoProvider for ScriptedProvider {
        fn text_to_video(
            &self,
            _request: ProviderRequest,
        ) -> BoxFuture<'static, Result<ProviderOutput, VideoGenError>> {
            match &self.script {
                Script::Output(make) => {
                    let output = make();
                    async move { Ok(output) }.boxed()
                }
                Script::Fail(msg) => {
                    let msg = msg.clone();
                    async move { Err(VideoGenError::ProviderError(msg)) }.boxed()
                }
                Script::Hang => async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(ProviderOutput::Bytes(VIDEO.to_vec()))
                }
                .boxed(),
                Script::Panic => futures::future::lazy(
                    |_| -> Result<ProviderOutput, VideoGenError> { panic!("provider exploded") },
                )
                .boxed(),
            }
        }
    }

    fn settings(timeout: Option<Duration>) -> GeneratorSettings {
        GeneratorSettings {
            model_id: "Wan-AI/Wan2.2-T2V-A14B".to_string(),
            timeout,
            mock_delay: Duration::from_secs(3),
            mock_video_url: "/video-static/generated_videos/mock_video.mp4".to_string(),
        }
    }

    fn mock_generator() -> VideoGenerator {
        VideoGenerator::new(TaskStore::new(), None, VideoStorage::Inline, settings(None))
    }

    fn provider_generator(
        script: Script,
        storage: VideoStorage,
        timeout: Option<Duration>,
    ) -> VideoGenerator {
        VideoGenerator::new(
            TaskStore::new(),
            Some(Arc::new(ScriptedProvider { script })),
            storage,
            settings(timeout),
        )
    }

    fn file_storage(dir: &std::path::Path) -> VideoStorage {
        VideoStorage::File {
            dir: dir.join("generated_videos"),
            url_prefix: "/video-static/generated_videos".to_string(),
        }
    }

    #[tokio::test]
    async fn test_short_prompt_creates_no_task() {
        let generator = mock_generator();

        for prompt in ["", "  ", "ab", "  ab  ", "\tx\n"] {
            let err = generator.submit(prompt, Some(5)).await.unwrap_err();
            assert!(matches!(err, VideoGenError::InvalidInput(_)), "{prompt:?}");
        }
        assert_eq!(generator.tasks.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_generation_completes_after_delay() {
        let generator = mock_generator();
        let start = tokio::time::Instant::now();

        let outcome = generator.submit("a cat playing piano", Some(5)).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(3));
        assert_eq!(outcome.provider, ProviderKind::Mock);
        let expected = VideoRef::Url("/video-static/generated_videos/mock_video.mp4".into());
        assert_eq!(outcome.result, GenerationResult::Success(expected.clone()));

        let status = generator.get_status(&outcome.task_id).await;
        assert_eq!(status.status, ApiStatus::Success);
        assert_eq!(status.video, Some(expected));
        assert_eq!(status.task_id.as_deref(), Some(outcome.task_id.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_ids_are_unique_for_any_prompt() {
        let generator = mock_generator();
        let mut ids = std::collections::HashSet::new();

        for prompt in ["abc", "   xyz   ", "日本語のプロンプト", "a cat playing piano"] {
            let outcome = generator.submit(prompt, None).await.unwrap();
            assert!(matches!(outcome.result, GenerationResult::Success(_)));
            assert!(ids.insert(outcome.task_id));
        }
        assert_eq!(generator.tasks.len().await, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_mock_request_still_completes() {
        let generator = mock_generator();

        let request = {
            let generator = generator.clone();
            tokio::spawn(async move { generator.submit("a cat playing piano", None).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        request.abort();
        assert!(request.await.unwrap_err().is_cancelled());

        tokio::time::sleep(Duration::from_secs(3600)).await;

        let tasks = generator.tasks.all().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Completed);
        assert_eq!(
            tasks[0].video,
            Some(VideoRef::Url(
                "/video-static/generated_videos/mock_video.mp4".into()
            ))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_provider_does_not_block_siblings() {
        let hanging = provider_generator(Script::Hang, VideoStorage::Inline, None);
        let sibling = VideoGenerator::new(
            hanging.tasks.clone(),
            None,
            VideoStorage::Inline,
            settings(None),
        );

        let slow = {
            let hanging = hanging.clone();
            tokio::spawn(async move { hanging.submit("a slow cinematic shot", None).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        let pending = hanging.tasks.all().await;
        assert_eq!(pending.len(), 1);
        let status = hanging.get_status(&pending[0].id).await;
        assert_eq!(status.status, ApiStatus::Processing);

        let outcome = sibling.submit("a cat playing piano", None).await.unwrap();
        assert!(matches!(outcome.result, GenerationResult::Success(_)));
        assert!(!slow.is_finished());

        let slow_outcome = slow.await.unwrap().unwrap();
        assert!(matches!(slow_outcome.result, GenerationResult::Success(_)));
        assert_eq!(
            hanging.get_status(&slow_outcome.task_id).await.status,
            ApiStatus::Success
        );
    }

    #[tokio::test]
    async fn test_every_payload_shape_stores_identical_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("provider_output.mp4");
        std::fs::write(&source, VIDEO).unwrap();

        let path_source = source.clone();
        let scripts: Vec<MakeOutput> = vec![
            Arc::new(|| ProviderOutput::Bytes(VIDEO.to_vec())) as MakeOutput,
            Arc::new(|| {
                ProviderOutput::Content(VideoContent {
                    content: VIDEO.to_vec(),
                    content_type: Some("video/mp4".into()),
                })
            }) as MakeOutput,
            Arc::new(|| ProviderOutput::Reader(Box::new(Cursor::new(VIDEO.to_vec())))) as MakeOutput,
            Arc::new(move || ProviderOutput::Path(path_source.clone())) as MakeOutput,
        ];

        for make in scripts {
            let generator =
                provider_generator(Script::Output(make), file_storage(dir.path()), None);
            let outcome = generator.submit("a cat playing piano", None).await.unwrap();

            let file_name = VideoStorage::file_name(&outcome.task_id);
            assert_eq!(
                outcome.result,
                GenerationResult::Success(VideoRef::Url(format!(
                    "/video-static/generated_videos/{file_name}"
                ))),
            );
            let stored: PathBuf = dir.path().join("generated_videos").join(file_name);
            assert_eq!(std::fs::read(stored).unwrap(), VIDEO);
        }
    }

    #[tokio::test]
    async fn test_inline_mode_returns_base64() {
        let generator = provider_generator(
            Script::Output(Arc::new(|| ProviderOutput::Bytes(vec![0, 1, 2]))),
            VideoStorage::Inline,
            None,
        );

        let outcome = generator.submit("a cat playing piano", Some(5)).await.unwrap();
        assert_eq!(
            outcome.result,
            GenerationResult::Success(VideoRef::Inline("AAEC".into()))
        );
        assert_eq!(outcome.duration, Some(MODEL_DURATION_SECS));
        assert!(!outcome.message.contains("ignored"));
    }

    #[tokio::test]
    async fn test_requested_duration_is_not_claimed() {
        let generator = provider_generator(
            Script::Output(Arc::new(|| ProviderOutput::Bytes(VIDEO.to_vec()))),
            VideoStorage::Inline,
            None,
        );

        let outcome = generator.submit("a cat playing piano", Some(12)).await.unwrap();
        assert_eq!(outcome.duration, Some(5));
        assert!(outcome.message.contains("requested 12s was ignored"));
    }

    #[tokio::test]
    async fn test_empty_payload_fails_task() {
        let generator = provider_generator(
            Script::Output(Arc::new(|| ProviderOutput::Bytes(Vec::new()))),
            VideoStorage::Inline,
            None,
        );

        let outcome = generator.submit("a cat playing piano", None).await.unwrap();
        assert_eq!(
            outcome.result,
            GenerationResult::Failed("No video content received from AI model".into())
        );

        let task = generator.tasks.get(&outcome.task_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.video.is_none());
    }

    #[tokio::test]
    async fn test_frame_errors_are_annotated() {
        let generator = provider_generator(
            Script::Fail("Hugging Face API error: 422 - num_frames must be <= 81".into()),
            VideoStorage::Inline,
            None,
        );

        let outcome = generator.submit("a cat playing piano", None).await.unwrap();
        let GenerationResult::Failed(reason) = &outcome.result else {
            panic!("expected failure, got {:?}", outcome.result);
        };
        assert!(reason.contains("num_frames must be <= 81"));
        assert!(reason.contains("likely a model limitation"));

        let status = generator.get_status(&outcome.task_id).await;
        assert_eq!(status.status, ApiStatus::Error);
        assert_eq!(&status.message, reason);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout_fails_task() {
        let generator = provider_generator(
            Script::Hang,
            VideoStorage::Inline,
            Some(Duration::from_secs(240)),
        );

        let outcome = generator.submit("a cat playing piano", None).await.unwrap();
        let GenerationResult::Failed(reason) = &outcome.result else {
            panic!("expected timeout, got {:?}", outcome.result);
        };
        assert!(reason.contains("timed out"));

        let task = generator.tasks.get(&outcome.task_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_resubmission_gets_fresh_task() {
        let generator = provider_generator(
            Script::Fail("Service Unavailable".into()),
            VideoStorage::Inline,
            None,
        );

        let first = generator.submit("a cat playing piano", None).await.unwrap();
        let before = generator.tasks.get(&first.task_id).await.unwrap();

        let second = generator.submit("a cat playing piano", None).await.unwrap();
        assert_ne!(first.task_id, second.task_id);

        let after = generator.tasks.get(&first.task_id).await.unwrap();
        assert_eq!(after.status, TaskStatus::Failed);
        assert_eq!(after.error, before.error);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(generator.tasks.len().await, 2);
    }

    #[tokio::test]
    async fn test_worker_panic_is_internal_error() {
        let generator = provider_generator(Script::Panic, VideoStorage::Inline, None);

        let err = generator
            .submit("a cat playing piano", None)
            .await
            .unwrap_err();
        assert!(matches!(err, VideoGenError::Internal(_)));
        assert_eq!(generator.tasks.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_task_status() {
        let generator = mock_generator();
        let status = generator.get_status("does-not-exist").await;

        assert_eq!(status.status, ApiStatus::Error);
        assert_eq!(status.message, "Task not found");
        assert!(status.task_id.is_none());
    }

    #[tokio::test]
    async fn test_processing_projection() {
        let generator = mock_generator();
        generator
            .tasks
            .insert(GenerationTask::processing(
                "t1".into(),
                ProviderKind::HuggingFace,
                "a cat".into(),
            ))
            .await
            .unwrap();

        let status = generator.get_status("t1").await;
        assert_eq!(status.status, ApiStatus::Processing);
        assert_eq!(status.message, "Video is still being generated...");
    }
}
