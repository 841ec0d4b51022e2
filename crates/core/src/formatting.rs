//! Plain-text clean-up for model replies shown in a terminal or chat bubble.

use once_cell::sync::Lazy;
use regex::Regex;

static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*\*[ \t]+").expect("valid bullet regex"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold regex"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("valid italic regex"));
static STRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*{2,}").expect("valid asterisk regex"));
static BLANK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*(\n[ \t]*)+\n").expect("valid blank line regex"));

/// Remove markdown emphasis, turn `* ` bullets into `• ` and squeeze blank
/// line runs down to a single empty line.
pub fn strip_markdown(text: &str) -> String {
    let text = BULLET.replace_all(text, "• ");
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = STRAY.replace_all(&text, "");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}
