//! Terminal chat loop driving one session and the task board.

use anyhow::Result;
use companion_core::{
    ChatSession, NotificationLevel, Role, SessionError, SessionEvent, TaskBoard,
};
use companion_interfaces::Interface;
use tokio::sync::broadcast::{self, error::TryRecvError};

const HELP: &str = "\
Commands:
  ideas          - Ask the assistant for task suggestions
  approve <n>    - Add suggestion n as a task
  decline <n>    - Dismiss suggestion n
  board          - Show all tasks with progress
  toggle <n>     - Mark board task n done / not done
  rm <n>         - Delete board task n
  refresh        - Reload tasks
  clear          - Clear the screen
  help           - Show this help
  exit, quit     - Leave
Anything else is sent to the assistant.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Ideas,
    Approve(usize),
    Decline(usize),
    Board,
    Toggle(usize),
    Remove(usize),
    Refresh,
    Clear,
    Exit,
    Chat(String),
}

impl ReplCommand {
    /// Numbered forms need a positive integer; anything else is chat text.
    /// Board deletion is `rm` so every `remove ...` line reaches the
    /// assistant's delete command.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default().to_lowercase();
        let number = match (words.next(), words.next()) {
            (Some(n), None) => n.parse::<usize>().ok().filter(|n| *n > 0),
            _ => None,
        };
        let bare = line.split_whitespace().count() == 1;

        match (head.as_str(), number) {
            ("help", _) if bare => ReplCommand::Help,
            ("ideas", _) if bare => ReplCommand::Ideas,
            ("board", _) if bare => ReplCommand::Board,
            ("refresh", _) if bare => ReplCommand::Refresh,
            ("clear", _) if bare => ReplCommand::Clear,
            ("exit" | "quit", _) if bare => ReplCommand::Exit,
            ("approve", Some(n)) => ReplCommand::Approve(n),
            ("decline", Some(n)) => ReplCommand::Decline(n),
            ("toggle", Some(n)) => ReplCommand::Toggle(n),
            ("rm", Some(n)) => ReplCommand::Remove(n),
            _ => ReplCommand::Chat(line.to_string()),
        }
    }
}

pub struct ChatRepl<I: Interface> {
    interface: I,
    session: ChatSession,
    board: TaskBoard,
    events: broadcast::Receiver<SessionEvent>,
}

impl<I: Interface> ChatRepl<I> {
    /// `events` must be subscribed to the bus both `session` and `board`
    /// publish on.
    pub fn new(
        interface: I,
        session: ChatSession,
        board: TaskBoard,
        events: broadcast::Receiver<SessionEvent>,
    ) -> Self {
        Self {
            interface,
            session,
            board,
            events,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn board(&self) -> &TaskBoard {
        &self.board
    }

    pub async fn run(&mut self) -> Result<()> {
        let _ = self.session.start().await;
        let _ = self.board.load().await;

        for message in self.session.messages() {
            self.show_message(message.role, &message.content).await;
        }
        self.interface.show_status("Type 'help' for commands.").await;
        self.drain_events().await;

        while let Some(line) = self.interface.receive_input("you> ").await {
            if line.is_empty() {
                continue;
            }

            let command = ReplCommand::parse(&line);
            if command == ReplCommand::Exit {
                self.interface.send_output("Take care! 👋").await;
                break;
            }

            self.handle(command).await;
            self.drain_events().await;
        }

        self.session.close();
        Ok(())
    }

    async fn handle(&mut self, command: ReplCommand) {
        match command {
            ReplCommand::Help => self.interface.send_output(HELP).await,
            ReplCommand::Clear => self.interface.send_output("\x1B[2J\x1B[1;1H").await,
            ReplCommand::Exit => {}
            ReplCommand::Chat(text) => match self.session.send(&text).await {
                Ok(Some(reply)) => self.show_message(reply.role, &reply.content).await,
                Ok(None) => {}
                Err(e) => self.session_error(&e).await,
            },
            ReplCommand::Ideas => match self.session.request_suggestions().await {
                Ok(suggestions) => {
                    let mut lines = vec!["Suggestions:".to_string()];
                    for (i, suggestion) in suggestions.iter().enumerate() {
                        lines.push(format!("  {}. {}", i + 1, suggestion.text));
                    }
                    lines.push("Use 'approve <n>' to add one.".to_string());
                    self.interface.send_output(&lines.join("\n")).await;
                }
                Err(e) => self.session_error(&e).await,
            },
            ReplCommand::Approve(n) => match self.session.approve_suggestion(n - 1).await {
                Ok(task) => {
                    self.interface
                        .send_output(&format!("Added task: {}", task.title))
                        .await
                }
                Err(e) => self.suggestion_error(n, &e).await,
            },
            ReplCommand::Decline(n) => match self.session.decline_suggestion(n - 1) {
                Ok(suggestion) => {
                    self.interface
                        .show_status(&format!("Dismissed: {}", suggestion.text))
                        .await
                }
                Err(e) => self.suggestion_error(n, &e).await,
            },
            ReplCommand::Board => {
                if self.board.load().await.is_ok() {
                    self.show_board().await;
                }
            }
            ReplCommand::Toggle(n) => {
                let Some(task) = self.board.tasks().into_iter().nth(n - 1) else {
                    self.interface
                        .show_error(&format!("No task at position {}", n))
                        .await;
                    return;
                };
                if self.board.toggle(&task.id).await.is_ok() {
                    self.show_board().await;
                }
            }
            ReplCommand::Remove(n) => {
                let Some(task) = self.board.tasks().into_iter().nth(n - 1) else {
                    self.interface
                        .show_error(&format!("No task at position {}", n))
                        .await;
                    return;
                };
                let question = format!("Delete \"{}\"?", task.title);
                if !self.interface.request_approval(&question).await {
                    self.interface.show_status("Kept.").await;
                    return;
                }
                if self.board.remove(&task.id).await.is_ok() {
                    self.show_board().await;
                }
            }
            ReplCommand::Refresh => match self.session.refresh_tasks().await {
                Ok(count) => {
                    let _ = self.board.load().await;
                    self.interface
                        .show_status(&format!("{} tasks loaded.", count))
                        .await;
                }
                Err(e) => self.session_error(&e).await,
            },
        }
    }

    async fn show_message(&self, role: Role, content: &str) {
        let speaker = match role {
            Role::User => "you",
            Role::Assistant | Role::System => "assistant",
        };
        self.interface
            .send_output(&format!("{}> {}", speaker, content))
            .await;
    }

    async fn show_board(&self) {
        let tasks = self.board.tasks();
        if tasks.is_empty() {
            self.interface.send_output("No tasks yet.").await;
            return;
        }

        let mut lines: Vec<String> = tasks
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let mark = if task.completed { "x" } else { " " };
                format!("{:>3}. [{}] {}", i + 1, mark, task.title)
            })
            .collect();

        let stats = self.board.stats();
        lines.push(format!(
            "Progress: {}/{} done ({}%)",
            stats.completed, stats.total, stats.percent
        ));
        self.interface.send_output(&lines.join("\n")).await;
    }

    /// Errors with a notification are shown when events are drained.
    async fn session_error(&self, error: &SessionError) {
        if !error.is_reported() {
            self.interface.show_error(&error.to_string()).await;
        }
    }

    async fn suggestion_error(&self, number: usize, error: &SessionError) {
        match error {
            SessionError::SuggestionNotFound(_) => {
                self.interface
                    .show_error(&format!("No suggestion number {}", number))
                    .await
            }
            other => self.session_error(other).await,
        }
    }

    /// Print pending notifications and resync views after committed changes.
    async fn drain_events(&mut self) {
        let mut changed = false;

        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::Notification(n)) => {
                    let text = format!("{}: {}", n.title, n.description);
                    match n.level {
                        NotificationLevel::Info => self.interface.show_status(&text).await,
                        NotificationLevel::Error => self.interface.show_error(&text).await,
                    }
                }
                Ok(SessionEvent::TasksChanged) => changed = true,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Dropped {} session events", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if changed {
            let _ = self.session.refresh_tasks().await;
            let _ = self.board.load().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ReplCommand::parse("help"), ReplCommand::Help);
        assert_eq!(ReplCommand::parse("  IDEAS "), ReplCommand::Ideas);
        assert_eq!(ReplCommand::parse("approve 2"), ReplCommand::Approve(2));
        assert_eq!(ReplCommand::parse("toggle 1"), ReplCommand::Toggle(1));
        assert_eq!(ReplCommand::parse("rm 3"), ReplCommand::Remove(3));
        assert_eq!(ReplCommand::parse("quit"), ReplCommand::Exit);
    }

    #[test]
    fn test_non_numeric_forms_are_chat() {
        assert_eq!(
            ReplCommand::parse("remove: yoga"),
            ReplCommand::Chat("remove: yoga".to_string())
        );
        assert_eq!(
            ReplCommand::parse("remove 2"),
            ReplCommand::Chat("remove 2".to_string())
        );
        assert_eq!(
            ReplCommand::parse("rm 0"),
            ReplCommand::Chat("rm 0".to_string())
        );
        assert_eq!(
            ReplCommand::parse("help me relax"),
            ReplCommand::Chat("help me relax".to_string())
        );
        assert_eq!(
            ReplCommand::parse("approve 1 2"),
            ReplCommand::Chat("approve 1 2".to_string())
        );
    }
}
