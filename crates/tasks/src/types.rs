use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A task row as held by the backing store.
///
/// Identity is `id`; titles are not unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    #[serde(rename = "user_id")]
    pub owner: String,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload. Construct through [`NewTask::new`] so the title is always
/// trimmed and non-empty.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewTask {
    #[serde(rename = "user_id")]
    pub owner: String,
    pub title: String,
    pub completed: bool,
}

impl NewTask {
    pub fn new(owner: impl Into<String>, title: &str) -> Result<Self, StoreError> {
        let owner = owner.into();
        if owner.trim().is_empty() {
            return Err(StoreError::Invalid("owner must be non-empty".to_string()));
        }

        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::Invalid("title must be non-empty".to_string()));
        }

        Ok(Self {
            owner,
            title: title.to_string(),
            completed: false,
        })
    }
}

/// Partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            title: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_none() && self.title.is_none()
    }

    pub(crate) fn apply(&self, task: &mut Task) {
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
    }
}

/// Query scope. Results are always newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFilter {
    pub owner: String,
    pub limit: Option<usize>,
}

impl TaskFilter {
    pub fn owner(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_trims_title() {
        let task = NewTask::new("user-1", "  Evening walk  ").unwrap();
        assert_eq!(task.title, "Evening walk");
        assert!(!task.completed);
    }

    #[test]
    fn test_new_task_rejects_blank_title() {
        let result = NewTask::new("user-1", "   ");
        assert!(matches!(result, Err(StoreError::Invalid(_))));
    }

    #[test]
    fn test_task_row_uses_user_id_column() {
        let row = serde_json::json!({
            "id": "a1",
            "user_id": "user-1",
            "title": "Drink water",
            "completed": true,
            "created_at": "2024-05-01T10:00:00.123456+00:00"
        });

        let task: Task = serde_json::from_value(row).unwrap();
        assert_eq!(task.owner, "user-1");
        assert!(task.completed);
    }

    #[test]
    fn test_patch_skips_unset_fields() {
        let body = serde_json::to_value(TaskPatch::completed(true)).unwrap();
        assert_eq!(body, serde_json::json!({ "completed": true }));
    }
}
