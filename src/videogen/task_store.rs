use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use super::types::VideoGenError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Processing)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    #[serde(rename = "huggingface")]
    HuggingFace,
    #[serde(rename = "mock")]
    Mock,
}

/// Where a finished video can be fetched from
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VideoRef {
    Url(String),
    /// Base64-encoded bytes
    Inline(String),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GenerationTask {
    pub id: String,
    pub status: TaskStatus,
    pub provider: ProviderKind,
    pub created_at: DateTime<Utc>,
    pub prompt: String,
    pub video: Option<VideoRef>,
    pub error: Option<String>,
}

impl GenerationTask {
    pub fn processing(id: String, provider: ProviderKind, prompt: String) -> Self {
        Self {
            id,
            status: TaskStatus::Processing,
            provider,
            created_at: Utc::now(),
            prompt,
            video: None,
            error: None,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TaskStoreError {
    #[error("task {0} already exists")]
    DuplicateId(String),
    #[error("task {0} not found")]
    NotFound(String),
    #[error("task {id} is already {status:?}")]
    AlreadyTerminal { id: String, status: TaskStatus },
}

impl From<TaskStoreError> for VideoGenError {
    fn from(e: TaskStoreError) -> Self {
        VideoGenError::Internal(e.to_string())
    }
}

/// In-memory task table shared by all request handlers.
///
/// Records live for the lifetime of the process. Each record moves out of
/// `Processing` exactly once; later writes are rejected.
#[derive(Clone, Default)]
pub struct TaskStore {
    tasks: Arc<RwLock<HashMap<String, GenerationTask>>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, task: GenerationTask) -> Result<(), TaskStoreError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(TaskStoreError::DuplicateId(task.id));
        }
        tasks.insert(task.id.clone(), task);
        Ok(())
    }

    pub async fn complete(&self, id: &str, video: VideoRef) -> Result<(), TaskStoreError> {
        self.resolve(id, |task| {
            task.status = TaskStatus::Completed;
            task.video = Some(video);
        })
        .await
    }

    pub async fn fail(&self, id: &str, error: String) -> Result<(), TaskStoreError> {
        self.resolve(id, |task| {
            task.status = TaskStatus::Failed;
            task.error = Some(error);
        })
        .await
    }

    async fn resolve(
        &self,
        id: &str,
        apply: impl FnOnce(&mut GenerationTask),
    ) -> Result<(), TaskStoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| TaskStoreError::NotFound(id.to_string()))?;

        if task.status.is_terminal() {
            return Err(TaskStoreError::AlreadyTerminal {
                id: id.to_string(),
                status: task.status,
            });
        }

        apply(task);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<GenerationTask> {
        self.tasks.read().await.get(id).cloned()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    #[cfg(test)]
    pub async fn all(&self) -> Vec<GenerationTask> {
        self.tasks.read().await.values().cloned().collect()
    }
}
