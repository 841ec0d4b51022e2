use crate::session::SessionPhase;
use companion_providers::ProviderError;
use companion_tasks::StoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session is busy ({0})")]
    Busy(SessionPhase),
    #[error("Session is closed")]
    Closed,
    #[error("Message is empty")]
    EmptyInput,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Model error: {0}")]
    Model(#[from] ProviderError),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Request cancelled")]
    Cancelled,
    #[error("Model returned no usable suggestions")]
    NoUsableSuggestions,
    #[error("No suggestion at position {0}")]
    SuggestionNotFound(usize),
    #[error("Task not found: {0}")]
    TaskNotFound(String),
}

impl SessionError {
    /// Whether the session already published a notification for this error.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            SessionError::Store(_)
                | SessionError::Model(_)
                | SessionError::Timeout(_)
                | SessionError::Cancelled
                | SessionError::NoUsableSuggestions
        )
    }
}
