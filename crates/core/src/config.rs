use crate::suggestions::MAX_SUGGESTIONS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of one chat session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Prior messages included in a free-form prompt.
    pub history_window: usize,
    /// Recent tasks rendered into model prompts.
    pub task_context_limit: usize,
    /// Tasks fetched into the session cache.
    pub task_fetch_limit: usize,
    /// At most [`MAX_SUGGESTIONS`].
    pub max_suggestions: usize,
    pub model_timeout_secs: u64,
    pub store_timeout_secs: u64,
    pub strip_markdown: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_window: 10,
            task_context_limit: 10,
            task_fetch_limit: 50,
            max_suggestions: 5,
            model_timeout_secs: 60,
            store_timeout_secs: 15,
            strip_markdown: false,
        }
    }
}

impl SessionConfig {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        let checks = [
            (self.history_window, "history_window"),
            (self.task_context_limit, "task_context_limit"),
            (self.task_fetch_limit, "task_fetch_limit"),
            (self.max_suggestions, "max_suggestions"),
        ];
        for (value, name) in checks {
            if value == 0 {
                return Err(format!("session.{} must be greater than zero", name));
            }
        }

        if self.max_suggestions > MAX_SUGGESTIONS {
            return Err(format!(
                "session.max_suggestions cannot exceed {}",
                MAX_SUGGESTIONS
            ));
        }

        if self.model_timeout_secs == 0 || self.store_timeout_secs == 0 {
            return Err("session timeouts must be greater than zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.model_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = SessionConfig {
            history_window: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("history_window"));
    }

    #[test]
    fn test_suggestion_cap_above_five_rejected() {
        let config = SessionConfig {
            max_suggestions: 8,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("max_suggestions"));

        let config = SessionConfig {
            max_suggestions: MAX_SUGGESTIONS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{ "max_suggestions": 3 }"#).unwrap();
        assert_eq!(config.max_suggestions, 3);
        assert_eq!(config.history_window, 10);
    }
}
