use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Transient user-facing toast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Notification(Notification),
    /// A mutation was committed; dependent views should reload.
    TasksChanged,
}

/// Fan-out of session events. Sending never fails: with no subscriber the
/// event is simply dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn notify(&self, notification: Notification) {
        if notification.is_error() {
            tracing::warn!("{}: {}", notification.title, notification.description);
        }
        let _ = self.sender.send(SessionEvent::Notification(notification));
    }

    pub fn tasks_changed(&self) {
        let _ = self.sender.send(SessionEvent::TasksChanged);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.notify(Notification::info("Task added", "\"Walk\" has been added."));
        bus.tasks_changed();

        match rx.recv().await.unwrap() {
            SessionEvent::Notification(n) => assert_eq!(n.title, "Task added"),
            other => panic!("Expected notification, got {:?}", other),
        }
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::TasksChanged);
    }

    #[test]
    fn test_send_without_subscribers_is_silent() {
        let bus = EventBus::default();
        bus.notify(Notification::error("AI error", "offline"));
        bus.tasks_changed();
    }
}
