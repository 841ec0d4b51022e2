//! One open chat interaction: conversation, task cache and suggestion batch,
//! plus the phase machine that keeps a single operation in flight.

use crate::config::SessionConfig;
use crate::conversation::{ChatMessage, Conversation};
use crate::error::SessionError;
use crate::events::{EventBus, Notification, SessionEvent};
use crate::executor::{Mutation, TaskActionExecutor};
use crate::intent::{parse_intent, Intent, COMMAND_HELP};
use crate::responder::{finish_reply, reply_prompt};
use crate::suggestions::{normalize_suggestions, suggestion_prompt, Suggestion, SuggestionBatch};
use companion_providers::{LanguageModel, ProviderError};
use companion_tasks::{StoreError, Task, TaskFilter, TaskStore};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loading,
    Mutating,
    AwaitingModelResponse,
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Loading => "loading tasks",
            SessionPhase::Mutating => "updating tasks",
            SessionPhase::AwaitingModelResponse => "waiting for the assistant",
            SessionPhase::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Returns the session to `Idle` when the operation ends, however it ends.
struct PhaseGuard<'a> {
    phase: &'a Mutex<SessionPhase>,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        let mut phase = self.phase.lock();
        if *phase != SessionPhase::Closed {
            *phase = SessionPhase::Idle;
        }
    }
}

#[derive(Default)]
struct SessionData {
    conversation: Conversation,
    tasks: Vec<Task>,
    suggestions: SuggestionBatch,
}

pub fn greeting() -> String {
    let commands = COMMAND_HELP
        .iter()
        .map(|c| format!("• {}", c))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Hi! I am your wellness assistant. Ask for task ideas to get suggestions you can approve, \
         or ask me anything! You can also:\n{}",
        commands
    )
}

pub struct ChatSession {
    store: Arc<dyn TaskStore>,
    model: Arc<dyn LanguageModel>,
    owner: String,
    config: SessionConfig,
    phase: Mutex<SessionPhase>,
    data: Mutex<SessionData>,
    events: EventBus,
    cancel: CancellationToken,
}

impl ChatSession {
    pub fn new(
        store: Arc<dyn TaskStore>,
        model: Arc<dyn LanguageModel>,
        owner: impl Into<String>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            model,
            owner: owner.into(),
            config,
            phase: Mutex::new(SessionPhase::Idle),
            data: Mutex::new(SessionData::default()),
            events: EventBus::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Build a session publishing on `events` and run
    /// [`ChatSession::start`]. Receivers subscribed to `events` beforehand
    /// see the outcome of the initial load; a failed load still returns a
    /// usable session with an empty cache.
    pub async fn open(
        store: Arc<dyn TaskStore>,
        model: Arc<dyn LanguageModel>,
        owner: impl Into<String>,
        config: SessionConfig,
        events: EventBus,
    ) -> Self {
        let session = Self::new(store, model, owner, config).with_events(events);
        if let Err(e) = session.start().await {
            tracing::warn!("Initial task load failed: {}", e);
        }
        session
    }

    /// Publish events on a caller-owned bus instead of a private one.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Greet the user and load the task cache. A failed load is reported
    /// and leaves the cache empty; the session stays usable.
    pub async fn start(&self) -> Result<(), SessionError> {
        {
            let mut data = self.data.lock();
            if data.conversation.is_empty() {
                data.conversation.push(ChatMessage::assistant(greeting()));
            }
        }

        tracing::info!(
            "Chat session opened for {} (store={}, model={})",
            self.owner,
            self.store.name(),
            self.model.name()
        );
        self.refresh_tasks().await.map(|_| ())
    }

    /// Re-fetch the task cache from the store.
    pub async fn refresh_tasks(&self) -> Result<usize, SessionError> {
        let _guard = self.begin(SessionPhase::Loading)?;
        let filter = TaskFilter::owner(self.owner.as_str()).with_limit(self.config.task_fetch_limit);

        let result = self
            .bounded(self.config.store_timeout(), None, self.store.select(&filter))
            .await;

        match result {
            Ok(tasks) => {
                let count = tasks.len();
                self.data.lock().tasks = tasks;
                tracing::debug!("Loaded {} tasks", count);
                Ok(count)
            }
            Err(e) => {
                self.report("Error loading tasks", &e);
                Err(e)
            }
        }
    }

    pub async fn send(&self, text: &str) -> Result<Option<ChatMessage>, SessionError> {
        self.dispatch(text, None).await
    }

    /// Like [`ChatSession::send`], additionally aborted when `cancel` fires.
    pub async fn send_with_cancel(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ChatMessage>, SessionError> {
        self.dispatch(text, Some(cancel)).await
    }

    async fn dispatch(
        &self,
        text: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<ChatMessage>, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let intent = parse_intent(text);
        let phase = if intent.is_structured() {
            SessionPhase::Mutating
        } else {
            SessionPhase::AwaitingModelResponse
        };
        let _guard = self.begin(phase)?;

        self.data.lock().conversation.push(ChatMessage::user(text));
        tracing::debug!("Chat input classified as {}", intent);

        if intent.is_structured() {
            self.run_command(&intent, cancel).await
        } else {
            self.reply(text, cancel).await
        }
    }

    async fn run_command(
        &self,
        intent: &Intent,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<ChatMessage>, SessionError> {
        let snapshot = self.data.lock().tasks.clone();
        let executor = TaskActionExecutor::new(self.store.as_ref(), &self.owner);

        let result = self
            .bounded(
                self.config.store_timeout(),
                cancel,
                executor.execute(intent, &snapshot),
            )
            .await;

        match result {
            Ok(Some(outcome)) => {
                let message = {
                    let mut data = self.data.lock();
                    if let Some(mutation) = &outcome.mutation {
                        mutation.apply_to(&mut data.tasks);
                    }
                    data.conversation
                        .push(ChatMessage::assistant(outcome.reply))
                        .clone()
                };
                if let Some(mutation) = &outcome.mutation {
                    self.announce(mutation);
                }
                Ok(Some(message))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                if intent.is_mutation() {
                    self.resync_after_abort(&e);
                }
                self.report(failure_title(intent), &e);
                Err(e)
            }
        }
    }

    async fn reply(
        &self,
        text: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<ChatMessage>, SessionError> {
        let prompt = {
            let data = self.data.lock();
            let limit = self.config.task_context_limit.min(data.tasks.len());
            let history = data
                .conversation
                .recent_before_last(self.config.history_window);
            reply_prompt(&data.tasks[..limit], history, text)
        };
        tracing::debug!("Free-form prompt: {} chars", prompt.len());

        let result = self
            .bounded(
                self.config.model_timeout(),
                cancel,
                self.model.complete(&prompt),
            )
            .await;

        match result {
            Ok(raw) => {
                let reply = finish_reply(&raw, self.config.strip_markdown);
                let message = self
                    .data
                    .lock()
                    .conversation
                    .push(ChatMessage::assistant(reply))
                    .clone();
                Ok(Some(message))
            }
            Err(e) => {
                self.report("AI error", &e);
                Err(e)
            }
        }
    }

    pub async fn request_suggestions(&self) -> Result<Vec<Suggestion>, SessionError> {
        self.generate_suggestions(None).await
    }

    pub async fn request_suggestions_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Suggestion>, SessionError> {
        self.generate_suggestions(Some(cancel)).await
    }

    /// Replace the suggestion batch with a fresh one from the model. The
    /// batch is emptied first, so a failure leaves no suggestions at all.
    async fn generate_suggestions(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<Suggestion>, SessionError> {
        let _guard = self.begin(SessionPhase::AwaitingModelResponse)?;

        let prompt = {
            let mut data = self.data.lock();
            data.suggestions.clear();
            let limit = self.config.task_context_limit.min(data.tasks.len());
            suggestion_prompt(&data.tasks[..limit])
        };

        let raw = match self
            .bounded(
                self.config.model_timeout(),
                cancel,
                self.model.complete(&prompt),
            )
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                self.report("AI error", &e);
                return Err(e);
            }
        };

        let items = normalize_suggestions(&raw, self.config.max_suggestions);
        if items.is_empty() {
            let e = SessionError::NoUsableSuggestions;
            self.report("AI error", &e);
            return Err(e);
        }

        self.data.lock().suggestions.replace(items.clone());
        tracing::info!("Received {} task suggestions", items.len());
        Ok(items)
    }

    /// Commit the suggestion at `index` as a new task through the same path
    /// as the add command. On failure the suggestion stays in the batch.
    pub async fn approve_suggestion(&self, index: usize) -> Result<Task, SessionError> {
        let _guard = self.begin(SessionPhase::Mutating)?;

        let suggestion = self
            .data
            .lock()
            .suggestions
            .take(index)
            .ok_or(SessionError::SuggestionNotFound(index))?;

        let executor = TaskActionExecutor::new(self.store.as_ref(), &self.owner);
        let result = self
            .bounded(
                self.config.store_timeout(),
                None,
                executor.add(&suggestion.text),
            )
            .await;

        match result {
            Ok(task) => {
                let mutation = Mutation::Added(task.clone());
                mutation.apply_to(&mut self.data.lock().tasks);
                self.announce(&mutation);
                Ok(task)
            }
            Err(e) => {
                self.data.lock().suggestions.restore(index, suggestion);
                self.resync_after_abort(&e);
                self.report("Error adding task", &e);
                Err(e)
            }
        }
    }

    /// Drop a suggestion without committing it.
    pub fn decline_suggestion(&self, index: usize) -> Result<Suggestion, SessionError> {
        self.ensure_open()?;
        self.data
            .lock()
            .suggestions
            .take(index)
            .ok_or(SessionError::SuggestionNotFound(index))
    }

    /// End the session: in-flight calls are cancelled and the conversation,
    /// cache and suggestions are discarded.
    pub fn close(&self) {
        *self.phase.lock() = SessionPhase::Closed;
        self.cancel.cancel();

        let mut data = self.data.lock();
        *data = SessionData::default();
        tracing::info!("Chat session closed for {}", self.owner);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock()
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.data.lock().conversation.messages().to_vec()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.data.lock().tasks.clone()
    }

    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.data.lock().suggestions.items().to_vec()
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if *self.phase.lock() == SessionPhase::Closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    fn begin(&self, next: SessionPhase) -> Result<PhaseGuard<'_>, SessionError> {
        let mut phase = self.phase.lock();
        match *phase {
            SessionPhase::Idle => {
                *phase = next;
                Ok(PhaseGuard { phase: &self.phase })
            }
            SessionPhase::Closed => Err(SessionError::Closed),
            busy => Err(SessionError::Busy(busy)),
        }
    }

    /// Race an external call against its time limit, the session's root
    /// token and the caller's token.
    async fn bounded<T, E, F>(
        &self,
        limit: Duration,
        cancel: Option<&CancellationToken>,
        call: F,
    ) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, E>>,
        SessionError: From<E>,
    {
        let caller = cancel.cloned().unwrap_or_default();

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SessionError::Cancelled),
            _ = caller.cancelled() => Err(SessionError::Cancelled),
            result = tokio::time::timeout(limit, call) => match result {
                Ok(inner) => inner.map_err(SessionError::from),
                Err(_) => Err(SessionError::Timeout(limit)),
            },
        }
    }

    fn announce(&self, mutation: &Mutation) {
        let notification = match mutation {
            Mutation::Added(task) => {
                Notification::info("Task added", format!("\"{}\" has been added.", task.title))
            }
            Mutation::Completed(_) => Notification::info("Task completed", "Task marked as done!"),
            Mutation::Deleted(_) => Notification::info("Task deleted", "Task removed successfully."),
        };
        self.events.notify(notification);
        self.events.tasks_changed();
    }

    /// A write abandoned by timeout or cancellation may still have been
    /// committed by the store, so views are told to reload.
    fn resync_after_abort(&self, error: &SessionError) {
        if matches!(error, SessionError::Timeout(_) | SessionError::Cancelled) {
            tracing::warn!("Task write abandoned ({}); requesting a reload", error);
            self.events.tasks_changed();
        }
    }

    fn report(&self, title: &str, error: &SessionError) {
        self.events.notify(notification_for(title, error));
    }
}

fn failure_title(intent: &Intent) -> &'static str {
    match intent {
        Intent::AddTask(_) => "Error adding task",
        Intent::CompleteTask(_) => "Error completing task",
        Intent::DeleteTask(_) => "Error deleting task",
        Intent::ListTasks | Intent::Unstructured(_) => "Error loading tasks",
    }
}

/// Map a failure to the toast the user sees.
pub fn notification_for(title: &str, error: &SessionError) -> Notification {
    match error {
        SessionError::Model(ProviderError::Configuration(msg)) => {
            Notification::error("Missing API key", msg.clone())
        }
        SessionError::Timeout(_) => Notification::error("Request timed out", error.to_string()),
        SessionError::Cancelled => Notification::error("Request cancelled", error.to_string()),
        SessionError::Store(StoreError::Http(msg)) => Notification::error("Network error", msg.clone()),
        SessionError::Store(inner) => Notification::error(title, inner.to_string()),
        SessionError::Model(inner) => Notification::error(title, inner.to_string()),
        other => Notification::error(title, other.to_string()),
    }
}
