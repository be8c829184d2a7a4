//! Event filters - Predicates deciding whether a handler sees an event

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::sync::Arc;

use super::parser::CommandParser;
use crate::domain::entities::Event;

/// Custom predicate closure
pub type Predicate = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Composable event filter
///
/// Combine with `&`, `|` and `!`:
/// `Filter::command(["ping"], ".") & Filter::Me`
#[derive(Clone)]
pub enum Filter {
    /// Matches every event
    All,
    /// Messages sent by the logged-in account
    Me,
    /// Messages in private chats
    Private,
    /// Service notices
    Service,
    /// Messages carrying text
    Text,
    /// Prefixed command with one of the given (lowercase) names
    Command { names: Vec<String>, parser: CommandParser },
    /// Callback queries whose data starts with the prefix
    CallbackData(String),
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
    Custom(Predicate),
}

impl Filter {
    pub fn command<I, S>(names: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Command {
            names: names.into_iter().map(|n| n.into().to_lowercase()).collect(),
            parser: CommandParser::new(prefix),
        }
    }

    pub fn callback_data(prefix: impl Into<String>) -> Self {
        Filter::CallbackData(prefix.into())
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Filter::Custom(Arc::new(predicate))
    }

    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Filter::All => true,
            Filter::Me => event.as_message().map(|m| m.outgoing).unwrap_or(false),
            Filter::Private => event.as_message().map(|m| m.chat.is_private()).unwrap_or(false),
            Filter::Service => event.as_message().map(|m| m.service).unwrap_or(false),
            Filter::Text => event.as_message().map(|m| m.text.is_some()).unwrap_or(false),
            Filter::Command { names, parser } => event
                .as_message()
                .and_then(|m| parser.parse_message(m))
                .map(|cmd| names.iter().any(|n| *n == cmd.name))
                .unwrap_or(false),
            Filter::CallbackData(prefix) => match event {
                Event::CallbackQuery(q) => q.data.as_deref().map(|d| d.starts_with(prefix.as_str())).unwrap_or(false),
                _ => false,
            },
            Filter::And(a, b) => a.matches(event) && b.matches(event),
            Filter::Or(a, b) => a.matches(event) || b.matches(event),
            Filter::Not(inner) => !inner.matches(event),
            Filter::Custom(predicate) => predicate(event),
        }
    }
}

impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        Filter::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        Filter::Or(Box::new(self), Box::new(rhs))
    }
}

impl Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => write!(f, "all"),
            Filter::Me => write!(f, "me"),
            Filter::Private => write!(f, "private"),
            Filter::Service => write!(f, "service"),
            Filter::Text => write!(f, "text"),
            Filter::Command { names, parser } => write!(f, "command({}{:?})", parser.prefix(), names),
            Filter::CallbackData(prefix) => write!(f, "callback_data({:?})", prefix),
            Filter::And(a, b) => write!(f, "({:?} & {:?})", a, b),
            Filter::Or(a, b) => write!(f, "({:?} | {:?})", a, b),
            Filter::Not(inner) => write!(f, "!{:?}", inner),
            Filter::Custom(_) => write!(f, "custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CallbackQuery, Chat, Message, User};

    fn incoming(text: &str) -> Event {
        Message::new(1, Chat::private(42))
            .with_sender(User::new(42))
            .with_text(text)
            .into()
    }

    fn outgoing(text: &str) -> Event {
        Message::new(2, Chat::group(-100, "friends"))
            .with_sender(User::new(1))
            .with_text(text)
            .outgoing()
            .into()
    }

    #[test]
    fn test_command_and_me() {
        let filter = Filter::command(["alive", "up"], ".") & Filter::Me;
        assert!(filter.matches(&outgoing(".alive")));
        assert!(filter.matches(&outgoing(".UP now")));
        assert!(!filter.matches(&outgoing(".ping")));
        assert!(!filter.matches(&incoming(".alive")));
    }

    #[test]
    fn test_private_not_me_not_service() {
        let filter = Filter::Private & !Filter::Me & !Filter::Service;
        assert!(filter.matches(&incoming("hi")));
        assert!(!filter.matches(&outgoing("hi")));

        let notice: Event = Message::new(3, Chat::private(42)).service().into();
        assert!(!filter.matches(&notice));
    }

    #[test]
    fn test_callback_and_custom() {
        let query: Event = CallbackQuery::new(User::new(5), "pm:approve:5").into();
        assert!(Filter::callback_data("pm:").matches(&query));
        assert!(!Filter::Text.matches(&query));

        let even_sender = Filter::custom(|e| e.sender().map(|u| u.id % 2 == 0).unwrap_or(false));
        assert!(!even_sender.matches(&query));
        assert!((even_sender | Filter::All).matches(&query));
    }
}
