//! Model-proposed task titles and their approval state.

use companion_tasks::Task;
use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound on one batch, whatever the configuration asks for.
pub const MAX_SUGGESTIONS: usize = 5;

static LEADING_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-*•\d.)\s]+").expect("valid marker regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
}

pub fn suggestion_prompt(tasks: &[Task]) -> String {
    let history = tasks
        .iter()
        .map(|task| {
            let marker = if task.completed { " (done)" } else { "" };
            format!("- {}{}", task.title, marker)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a wellness coach. Based on this task history, propose 3 short, actionable \
         wellness tasks (5-7 words each), return as plain lines without numbering.\n\
         Tasks so far:\n{}",
        history
    )
}

/// One suggestion per non-blank line, leading bullets and numbering removed,
/// at most `max` entries and never more than [`MAX_SUGGESTIONS`].
pub fn normalize_suggestions(raw: &str, max: usize) -> Vec<Suggestion> {
    raw.lines()
        .map(|line| LEADING_MARKERS.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .take(max.min(MAX_SUGGESTIONS))
        .map(|text| Suggestion { text })
        .collect()
}

/// The current batch awaiting user decisions. A new batch replaces the old
/// one wholesale.
#[derive(Debug, Clone, Default)]
pub struct SuggestionBatch {
    items: Vec<Suggestion>,
}

impl SuggestionBatch {
    pub fn replace(&mut self, items: Vec<Suggestion>) {
        self.items = items;
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[Suggestion] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Remove the entry at `index` for approval or decline.
    pub fn take(&mut self, index: usize) -> Option<Suggestion> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Put back an entry whose approval failed, at its old position.
    pub fn restore(&mut self, index: usize, suggestion: Suggestion) {
        let index = index.min(self.items.len());
        self.items.insert(index, suggestion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[Suggestion]) -> Vec<&str> {
        items.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_normalize_strips_markers() {
        let raw = "1. Take a walk\n- Drink water\n  Meditate  ";
        assert_eq!(
            texts(&normalize_suggestions(raw, 5)),
            vec!["Take a walk", "Drink water", "Meditate"]
        );
    }

    #[test]
    fn test_normalize_drops_blank_lines_and_caps() {
        let raw = "* One\r\n\r\n• Two\n3) Three\n\nFour\nFive\nSix\nSeven";
        assert_eq!(
            texts(&normalize_suggestions(raw, 5)),
            vec!["One", "Two", "Three", "Four", "Five"]
        );
    }

    #[test]
    fn test_normalize_never_exceeds_hard_cap() {
        let raw = "a\nb\nc\nd\ne\nf\ng\nh";
        assert_eq!(normalize_suggestions(raw, 8).len(), MAX_SUGGESTIONS);
        assert_eq!(normalize_suggestions(raw, 2).len(), 2);
    }

    #[test]
    fn test_normalize_garbage_is_empty() {
        assert!(normalize_suggestions("\n - \n 1. \n***", 5).is_empty());
    }

    #[test]
    fn test_prompt_lists_history() {
        let tasks = vec![Task {
            id: "1".to_string(),
            owner: "alice".to_string(),
            title: "Evening walk".to_string(),
            completed: true,
            created_at: chrono::Utc::now(),
        }];
        let prompt = suggestion_prompt(&tasks);
        assert!(prompt.contains("5-7 words"));
        assert!(prompt.ends_with("Tasks so far:\n- Evening walk (done)"));
    }

    #[test]
    fn test_batch_take_and_restore() {
        let mut batch = SuggestionBatch::default();
        batch.replace(normalize_suggestions("A\nB\nC", 5));

        let taken = batch.take(1).unwrap();
        assert_eq!(taken.text, "B");
        assert_eq!(texts(batch.items()), vec!["A", "C"]);

        batch.restore(1, taken);
        assert_eq!(texts(batch.items()), vec!["A", "B", "C"]);

        assert!(batch.take(7).is_none());
    }

    #[test]
    fn test_replace_discards_previous_batch() {
        let mut batch = SuggestionBatch::default();
        batch.replace(normalize_suggestions("Old one\nOld two", 5));
        batch.replace(normalize_suggestions("New", 5));
        assert_eq!(texts(batch.items()), vec!["New"]);
    }
}
