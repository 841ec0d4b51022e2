use crate::error::StoreError;
use crate::types::{NewTask, Task, TaskFilter, TaskPatch};
use async_trait::async_trait;

/// Client for the table of task records. Every operation is scoped to one
/// owner; rows of other owners behave as if they did not exist.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn select(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError>;

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError>;

    async fn update(&self, owner: &str, id: &str, patch: TaskPatch) -> Result<Task, StoreError>;

    async fn delete(&self, owner: &str, id: &str) -> Result<(), StoreError>;

    fn name(&self) -> &str;
}
