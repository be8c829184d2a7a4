//! Domain entities - Core business objects with no external dependencies

pub mod event;
pub mod records;
pub mod user;

pub use event::{CallbackQuery, Chat, ChatKind, Event, EventKind, InlineQuery, Message};
pub use records::{ApprovalRecord, LogEntry, LogLevel, UserStats};
pub use user::User;
