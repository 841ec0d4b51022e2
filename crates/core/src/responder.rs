//! Prompt construction and reply post-processing for free-form turns.

use crate::conversation::{render_transcript, ChatMessage};
use crate::executor::render_task_list;
use crate::formatting::strip_markdown;
use companion_tasks::Task;

pub const FALLBACK_REPLY: &str = "Sorry, I could not generate a response.";

/// System framing, recent tasks, prior turns (oldest first), then the new
/// user message and an open `Assistant:` turn.
pub fn reply_prompt(tasks: &[Task], history: &[ChatMessage], user_message: &str) -> String {
    let context = format!(
        "You are a supportive mental wellness assistant. The user has these recent tasks:\n{}\n\
         Be concise and kind. If the user asks to add a task, prefer the pattern: add task: <title>",
        render_task_list(tasks)
    );

    let history = render_transcript(history);
    let separator = if history.is_empty() { "" } else { "\n" };

    format!(
        "{}\n\n{}{}User: {}\nAssistant:",
        context, history, separator, user_message
    )
}

pub fn finish_reply(raw: &str, plain_text: bool) -> String {
    let reply = if plain_text {
        strip_markdown(raw)
    } else {
        raw.to_string()
    };

    if reply.trim().is_empty() {
        FALLBACK_REPLY.to_string()
    } else {
        reply
    }
}
