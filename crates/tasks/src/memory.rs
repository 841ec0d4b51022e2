use crate::error::StoreError;
use crate::store::TaskStore;
use crate::types::{NewTask, Task, TaskFilter, TaskPatch};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Task store kept in process memory, newest task first.
///
/// With a state file every mutation is written through (temp file + rename)
/// and [`MemoryTaskStore::restore`] reloads it on startup.
pub struct MemoryTaskStore {
    tasks: Arc<RwLock<Vec<Task>>>,
    state_file: Option<PathBuf>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(Vec::new())),
            state_file: None,
        }
    }

    pub fn with_state_file<P: AsRef<Path>>(state_file: P) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(Vec::new())),
            state_file: Some(state_file.as_ref().to_path_buf()),
        }
    }

    pub async fn restore(&self) -> Result<usize, StoreError> {
        let Some(state_file) = &self.state_file else {
            return Ok(0);
        };

        if !state_file.exists() {
            return Ok(0);
        }

        let content = tokio::fs::read_to_string(state_file).await?;
        let mut restored: Vec<Task> = serde_json::from_str(&content)?;
        // Stable sort keeps the saved order between equal timestamps.
        restored.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let count = restored.len();

        let mut tasks = self.tasks.write().await;
        *tasks = restored;
        drop(tasks);

        tracing::info!("Restored {} tasks from {:?}", count, state_file);
        Ok(count)
    }

    async fn persist_state(&self) -> Result<(), StoreError> {
        let Some(state_file) = &self.state_file else {
            return Ok(());
        };

        let snapshot = self.tasks.read().await.clone();

        if let Some(parent) = state_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_file = state_file.with_extension("tmp");
        let content = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(&tmp_file, content).await?;
        tokio::fs::rename(tmp_file, state_file).await?;

        Ok(())
    }
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn select(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        let limit = filter.limit.unwrap_or(usize::MAX);

        Ok(tasks
            .iter()
            .filter(|task| task.owner == filter.owner)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        let created = Task {
            id: uuid::Uuid::new_v4().to_string(),
            owner: task.owner,
            title: task.title,
            completed: task.completed,
            created_at: chrono::Utc::now(),
        };

        let mut tasks = self.tasks.write().await;
        tasks.insert(0, created.clone());
        drop(tasks);
        self.persist_state().await?;

        tracing::info!("Inserted task: {}", created.id);
        Ok(created)
    }

    async fn update(&self, owner: &str, id: &str, patch: TaskPatch) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id && task.owner == owner)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        patch.apply(task);
        let updated = task.clone();
        drop(tasks);
        self.persist_state().await?;

        tracing::info!("Updated task: {}", id);
        Ok(updated)
    }

    async fn delete(&self, owner: &str, id: &str) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let position = tasks
            .iter()
            .position(|task| task.id == id && task.owner == owner)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        tasks.remove(position);
        drop(tasks);
        self.persist_state().await?;

        tracing::info!("Deleted task: {}", id);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
