//! Applies structured intents to the task store and phrases the assistant's
//! confirmation.

use crate::intent::Intent;
use companion_tasks::{NewTask, StoreError, Task, TaskPatch, TaskStore};

pub const NO_TASKS_REPLY: &str = "No tasks yet.";

/// A committed change, to be mirrored into the caller's task cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Added(Task),
    Completed(Task),
    Deleted(Task),
}

impl Mutation {
    pub fn task(&self) -> &Task {
        match self {
            Mutation::Added(task) | Mutation::Completed(task) | Mutation::Deleted(task) => task,
        }
    }

    /// Mirror the change into a newest-first cache.
    pub fn apply_to(&self, tasks: &mut Vec<Task>) {
        match self {
            Mutation::Added(task) => tasks.insert(0, task.clone()),
            Mutation::Completed(task) => {
                if let Some(cached) = tasks.iter_mut().find(|t| t.id == task.id) {
                    *cached = task.clone();
                }
            }
            Mutation::Deleted(task) => tasks.retain(|t| t.id != task.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub reply: String,
    pub mutation: Option<Mutation>,
}

impl ActionOutcome {
    fn reply_only(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            mutation: None,
        }
    }
}

/// Numbered listing in cache order, `(done)` marking completed tasks.
pub fn render_task_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return NO_TASKS_REPLY.to_string();
    }

    tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let marker = if task.completed { " (done)" } else { "" };
            format!("{}. {}{}", i + 1, task.title, marker)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn title_contains(task: &Task, fragment: &str) -> bool {
    task.title.to_lowercase().contains(&fragment.to_lowercase())
}

/// Most recently created candidate; the earlier cache position wins a tie.
fn newest<'t>(candidates: impl Iterator<Item = &'t Task>) -> Option<&'t Task> {
    candidates.fold(None, |best: Option<&Task>, task| match best {
        Some(best) if best.created_at >= task.created_at => Some(best),
        _ => Some(task),
    })
}

/// Open task whose title contains `fragment`, ignoring case.
pub fn find_completable<'t>(tasks: &'t [Task], fragment: &str) -> Option<&'t Task> {
    newest(
        tasks
            .iter()
            .filter(|task| !task.completed && title_contains(task, fragment)),
    )
}

/// Any task whose title contains `fragment`, ignoring case.
pub fn find_deletable<'t>(tasks: &'t [Task], fragment: &str) -> Option<&'t Task> {
    newest(tasks.iter().filter(|task| title_contains(task, fragment)))
}

pub struct TaskActionExecutor<'a> {
    store: &'a dyn TaskStore,
    owner: &'a str,
}

impl<'a> TaskActionExecutor<'a> {
    pub fn new(store: &'a dyn TaskStore, owner: &'a str) -> Self {
        Self { store, owner }
    }

    /// Insert an open task. Shared by the add command and suggestion approval.
    pub async fn add(&self, title: &str) -> Result<Task, StoreError> {
        let task = self.store.insert(NewTask::new(self.owner, title)?).await?;
        tracing::info!("Task added: {}", task.id);
        Ok(task)
    }

    /// Run a structured intent against a snapshot of the cache. Returns
    /// `None` for [`Intent::Unstructured`]. On error nothing was committed.
    pub async fn execute(
        &self,
        intent: &Intent,
        tasks: &[Task],
    ) -> Result<Option<ActionOutcome>, StoreError> {
        let outcome = match intent {
            Intent::AddTask(title) => {
                let task = self.add(title).await?;
                ActionOutcome {
                    reply: format!("Added task: {}", task.title),
                    mutation: Some(Mutation::Added(task)),
                }
            }
            Intent::ListTasks => ActionOutcome::reply_only(render_task_list(tasks)),
            Intent::CompleteTask(fragment) => match find_completable(tasks, fragment) {
                Some(target) => {
                    let task = self
                        .store
                        .update(self.owner, &target.id, TaskPatch::completed(true))
                        .await?;
                    tracing::info!("Task completed: {}", task.id);
                    ActionOutcome {
                        reply: format!("Marked task as complete: {}", task.title),
                        mutation: Some(Mutation::Completed(task)),
                    }
                }
                None => ActionOutcome::reply_only(format!(
                    "Task not found or already completed: {}",
                    fragment
                )),
            },
            Intent::DeleteTask(fragment) => match find_deletable(tasks, fragment) {
                Some(target) => {
                    self.store.delete(self.owner, &target.id).await?;
                    tracing::info!("Task deleted: {}", target.id);
                    ActionOutcome {
                        reply: format!("Deleted task: {}", target.title),
                        mutation: Some(Mutation::Deleted(target.clone())),
                    }
                }
                None => ActionOutcome::reply_only(format!("Task not found: {}", fragment)),
            },
            Intent::Unstructured(_) => return Ok(None),
        };

        Ok(Some(outcome))
    }
}
