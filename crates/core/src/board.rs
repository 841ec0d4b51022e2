//! Full task list of one owner with optimistic edits.

use crate::events::{EventBus, Notification};
use companion_tasks::{NewTask, StoreError, Task, TaskFilter, TaskPatch, TaskStore};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardStats {
    pub completed: usize,
    pub total: usize,
    /// Rounded completion percentage, 0 for an empty board.
    pub percent: u8,
}

impl BoardStats {
    pub fn of(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        let percent = if total == 0 {
            0
        } else {
            (completed as f64 / total as f64 * 100.0).round() as u8
        };
        Self {
            completed,
            total,
            percent,
        }
    }
}

pub struct TaskBoard {
    store: Arc<dyn TaskStore>,
    owner: String,
    tasks: Mutex<Vec<Task>>,
    events: Option<EventBus>,
}

impl TaskBoard {
    pub fn new(store: Arc<dyn TaskStore>, owner: impl Into<String>) -> Self {
        Self {
            store,
            owner: owner.into(),
            tasks: Mutex::new(Vec::new()),
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn load(&self) -> Result<usize, StoreError> {
        match self.store.select(&TaskFilter::owner(self.owner.as_str())).await {
            Ok(tasks) => {
                let count = tasks.len();
                *self.tasks.lock() = tasks;
                Ok(count)
            }
            Err(e) => {
                self.notify(Notification::error("Error loading tasks", e.to_string()));
                Err(e)
            }
        }
    }

    pub async fn add(&self, title: &str) -> Result<Task, StoreError> {
        let new_task = NewTask::new(self.owner.as_str(), title)?;

        match self.store.insert(new_task).await {
            Ok(task) => {
                self.tasks.lock().insert(0, task.clone());
                self.notify(Notification::info(
                    "Task added",
                    format!("\"{}\" has been added.", task.title),
                ));
                self.changed();
                Ok(task)
            }
            Err(e) => {
                self.notify(Notification::error("Error adding task", e.to_string()));
                Err(e)
            }
        }
    }

    /// Flip the completion flag in the cache first, then commit. A rejected
    /// commit restores the previous state.
    pub async fn toggle(&self, id: &str) -> Result<Task, StoreError> {
        let previous = {
            let mut tasks = self.tasks.lock();
            let task = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let previous = task.clone();
            task.completed = !task.completed;
            previous
        };

        let patch = TaskPatch::completed(!previous.completed);
        match self.store.update(&self.owner, id, patch).await {
            Ok(task) => {
                self.replace(task.clone());
                self.changed();
                Ok(task)
            }
            Err(e) => {
                self.replace(previous);
                self.notify(Notification::error("Error completing task", e.to_string()));
                Err(e)
            }
        }
    }

    /// Drop the task from the cache first, then commit. A rejected commit
    /// puts it back at its old position.
    pub async fn remove(&self, id: &str) -> Result<Task, StoreError> {
        let (index, removed) = {
            let mut tasks = self.tasks.lock();
            let index = tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            (index, tasks.remove(index))
        };

        match self.store.delete(&self.owner, id).await {
            Ok(()) => {
                self.notify(Notification::info("Task deleted", "Task removed successfully."));
                self.changed();
                Ok(removed)
            }
            Err(e) => {
                {
                    let mut tasks = self.tasks.lock();
                    let index = index.min(tasks.len());
                    tasks.insert(index, removed);
                }
                self.notify(Notification::error("Error deleting task", e.to_string()));
                Err(e)
            }
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    pub fn stats(&self) -> BoardStats {
        BoardStats::of(&self.tasks.lock())
    }

    fn replace(&self, task: Task) {
        if let Some(cached) = self.tasks.lock().iter_mut().find(|t| t.id == task.id) {
            *cached = task;
        }
    }

    fn notify(&self, notification: Notification) {
        if let Some(events) = &self.events {
            events.notify(notification);
        }
    }

    fn changed(&self) {
        if let Some(events) = &self.events {
            events.tasks_changed();
        }
    }
}
