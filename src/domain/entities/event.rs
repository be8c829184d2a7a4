use super::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of inbound events a handler can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Message,
    CallbackQuery,
    InlineQuery,
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Message => "message",
            EventKind::CallbackQuery => "callback-query",
            EventKind::InlineQuery => "inline-query",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Channel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: i64,
    pub kind: ChatKind,
    pub title: Option<String>,
}

impl Chat {
    pub fn private(id: i64) -> Self {
        Self {
            id,
            kind: ChatKind::Private,
            title: None,
        }
    }

    pub fn group(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            kind: ChatKind::Group,
            title: Some(title.into()),
        }
    }

    pub fn is_private(&self) -> bool {
        self.kind == ChatKind::Private
    }
}

/// A chat message, incoming or sent by the logged-in account
#[derive(Debug, Clone)]
pub struct Message {
    pub id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    /// Sent by the account this agent is logged in as
    pub outgoing: bool,
    /// Join/leave/pin and other service notices
    pub service: bool,
    pub reply_to: Option<Box<Message>>,
    pub date: DateTime<Utc>,
}

impl Message {
    pub fn new(id: i64, chat: Chat) -> Self {
        Self {
            id,
            chat,
            from: None,
            text: None,
            outgoing: false,
            service: false,
            reply_to: None,
            date: Utc::now(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_sender(mut self, user: User) -> Self {
        self.from = Some(user);
        self
    }

    pub fn outgoing(mut self) -> Self {
        self.outgoing = true;
        self
    }

    pub fn service(mut self) -> Self {
        self.service = true;
        self
    }

    pub fn with_reply_to(mut self, message: Message) -> Self {
        self.reply_to = Some(Box::new(message));
        self
    }

    pub fn sender_id(&self) -> Option<i64> {
        self.from.as_ref().map(|u| u.id)
    }
}

/// Inline keyboard button press
#[derive(Debug, Clone)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub chat_id: Option<i64>,
    pub message_id: Option<i64>,
    pub data: Option<String>,
}

impl CallbackQuery {
    pub fn new(from: User, data: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from,
            chat_id: None,
            message_id: None,
            data: Some(data.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InlineQuery {
    pub id: String,
    pub from: User,
    pub query: String,
}

impl InlineQuery {
    pub fn new(from: User, query: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from,
            query: query.into(),
        }
    }
}

/// Inbound event delivered by the gateway
#[derive(Debug, Clone)]
pub enum Event {
    Message(Message),
    CallbackQuery(CallbackQuery),
    InlineQuery(InlineQuery),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Message(_) => EventKind::Message,
            Event::CallbackQuery(_) => EventKind::CallbackQuery,
            Event::InlineQuery(_) => EventKind::InlineQuery,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Event::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn sender(&self) -> Option<&User> {
        match self {
            Event::Message(m) => m.from.as_ref(),
            Event::CallbackQuery(q) => Some(&q.from),
            Event::InlineQuery(q) => Some(&q.from),
        }
    }
}

impl From<Message> for Event {
    fn from(message: Message) -> Self {
        Event::Message(message)
    }
}

impl From<CallbackQuery> for Event {
    fn from(query: CallbackQuery) -> Self {
        Event::CallbackQuery(query)
    }
}

impl From<InlineQuery> for Event {
    fn from(query: InlineQuery) -> Self {
        Event::InlineQuery(query)
    }
}
