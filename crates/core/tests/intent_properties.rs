//! Property tests for chat command classification.

#![allow(clippy::unwrap_used)]

use companion_core::{parse_intent, Intent};
use proptest::prelude::*;

fn title() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 ]{0,30}"
}

proptest! {
    #[test]
    fn test_add_yields_trimmed_title(title in title(), verb in prop::sample::select(vec!["add", "create", "ADD", "Create"])) {
        let input = format!("{} task: {}", verb, title);
        prop_assert_eq!(parse_intent(&input), Intent::AddTask(title.trim().to_string()));
    }

    #[test]
    fn test_complete_yields_fragment(fragment in title(), verb in prop::sample::select(vec!["complete", "done", "finish"])) {
        let input = format!("{}: {}", verb, fragment);
        prop_assert_eq!(parse_intent(&input), Intent::CompleteTask(fragment.trim().to_string()));
    }

    #[test]
    fn test_blank_argument_falls_through(
        verb in prop::sample::select(vec!["complete", "done", "finish", "delete", "remove", "add", "create"]),
        separator in prop::sample::select(vec!["", " task:", ":", " task : "]),
        padding in " {0,4}",
    ) {
        let input = format!("{}{}{}", verb, separator, padding);
        prop_assert_eq!(parse_intent(&input), Intent::Unstructured(input.clone()));
    }

    #[test]
    fn test_parsing_is_deterministic(input in any::<String>()) {
        prop_assert_eq!(parse_intent(&input), parse_intent(&input));
    }

    #[test]
    fn test_unmatched_text_is_kept_verbatim(input in "[xyz][a-z ]{0,40}") {
        prop_assert_eq!(parse_intent(&input), Intent::Unstructured(input.clone()));
    }
}

#[test]
fn test_list_forms() {
    for input in ["list", "show", "list tasks", "  SHOW TASKS  ", "showtasks"] {
        assert_eq!(parse_intent(input), Intent::ListTasks, "input: {:?}", input);
    }
    assert!(matches!(parse_intent("list my tasks"), Intent::Unstructured(_)));
}
