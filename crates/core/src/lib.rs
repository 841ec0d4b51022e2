pub mod board;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod executor;
pub mod formatting;
pub mod intent;
pub mod responder;
pub mod session;
pub mod suggestions;

pub use board::{BoardStats, TaskBoard};
pub use config::SessionConfig;
pub use conversation::{ChatMessage, Conversation, Role};
pub use error::SessionError;
pub use events::{EventBus, Notification, NotificationLevel, SessionEvent};
pub use executor::{ActionOutcome, Mutation, TaskActionExecutor};
pub use formatting::strip_markdown;
pub use intent::{parse_intent, Intent};
pub use responder::FALLBACK_REPLY;
pub use session::{ChatSession, SessionPhase};
pub use suggestions::{normalize_suggestions, Suggestion, MAX_SUGGESTIONS};
