//! Classification of one line of chat input into a structured command or
//! free-form conversation.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static ADD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(add|create)\s*(task\s*:\s*|:\s*)?(.*)$").expect("valid add regex")
});
static LIST_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(list|show)\s*(tasks)?\s*$").expect("valid list regex"));
static COMPLETE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(complete|done|finish)\s*(task\s*:\s*|:\s*)?(.*)$")
        .expect("valid complete regex")
});
static DELETE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(delete|remove)\s*(task\s*:\s*|:\s*)?(.*)$").expect("valid delete regex")
});

/// Commands the chat assistant understands, in the order they are tried.
pub const COMMAND_HELP: &[&str] = &[
    "add task: [title]",
    "complete task: [title]",
    "delete task: [title]",
    "list tasks",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    AddTask(String),
    ListTasks,
    CompleteTask(String),
    DeleteTask(String),
    Unstructured(String),
}

impl Intent {
    pub fn is_structured(&self) -> bool {
        !matches!(self, Intent::Unstructured(_))
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Intent::AddTask(_) | Intent::CompleteTask(_) | Intent::DeleteTask(_)
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::AddTask(title) => write!(f, "add({})", title),
            Intent::ListTasks => write!(f, "list"),
            Intent::CompleteTask(fragment) => write!(f, "complete({})", fragment),
            Intent::DeleteTask(fragment) => write!(f, "delete({})", fragment),
            Intent::Unstructured(_) => write!(f, "unstructured"),
        }
    }
}

/// Trimmed argument of a command pattern, or `None` when the pattern does not
/// match or its argument is blank.
fn argument(pattern: &Regex, text: &str) -> Option<String> {
    let captures = pattern.captures(text)?;
    let value = captures.get(3)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Total, side-effect free classifier. A command with a blank argument falls
/// through to the next pattern and finally to [`Intent::Unstructured`].
pub fn parse_intent(text: &str) -> Intent {
    if let Some(title) = argument(&ADD_PATTERN, text) {
        return Intent::AddTask(title);
    }

    if LIST_PATTERN.is_match(text) {
        return Intent::ListTasks;
    }

    if let Some(fragment) = argument(&COMPLETE_PATTERN, text) {
        return Intent::CompleteTask(fragment);
    }

    if let Some(fragment) = argument(&DELETE_PATTERN, text) {
        return Intent::DeleteTask(fragment);
    }

    Intent::Unstructured(text.to_string())
}
