//! Console gateway for development/testing
//!
//! Holds the handler list in memory, runs matching handlers for events fed
//! in by the caller, and prints outbound actions instead of sending them.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use tokio::task::JoinSet;

use crate::application::errors::GatewayError;
use crate::application::messaging::Filter;
use crate::domain::entities::{Chat, Event, EventKind, Message, User};
use crate::domain::traits::{EventGateway, EventHandler, HandlerId};

/// Outbound action recorded by the console gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundAction {
    Send { chat_id: i64, message_id: i64, text: String },
    Edit { chat_id: i64, message_id: i64, text: String },
    Delete { chat_id: i64, message_id: i64 },
    Block(i64),
    Unblock(i64),
}

impl OutboundAction {
    pub fn text(&self) -> Option<&str> {
        match self {
            OutboundAction::Send { text, .. } | OutboundAction::Edit { text, .. } => Some(text),
            _ => None,
        }
    }
}

struct InstalledHandler {
    id: HandlerId,
    kind: EventKind,
    filter: Filter,
    handler: EventHandler,
}

/// Console gateway for local development
pub struct ConsoleGateway {
    me: User,
    handlers: RwLock<Vec<InstalledHandler>>,
    next_handler_id: AtomicU64,
    next_message_id: AtomicI64,
    outbox: Mutex<Vec<OutboundAction>>,
    blocked: Mutex<HashSet<i64>>,
    echo: bool,
}

impl ConsoleGateway {
    pub fn new(me: User) -> Self {
        Self {
            me,
            handlers: RwLock::new(Vec::new()),
            next_handler_id: AtomicU64::new(1),
            next_message_id: AtomicI64::new(1),
            outbox: Mutex::new(Vec::new()),
            blocked: Mutex::new(HashSet::new()),
            echo: true,
        }
    }

    /// Stop printing outbound actions to stdout
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Allocate a message id for an inbound message built by the caller
    pub fn next_message_id(&self) -> i64 {
        self.next_message_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Run every matching handler concurrently and wait for all of them.
    /// Returns how many handlers ran.
    pub async fn dispatch(&self, event: Event) -> usize {
        let kind = event.kind();
        let matched: Vec<(HandlerId, EventHandler)> = match self.handlers.read() {
            Ok(handlers) => handlers
                .iter()
                .filter(|h| h.kind == kind && h.filter.matches(&event))
                .map(|h| (h.id, h.handler.clone()))
                .collect(),
            Err(_) => {
                tracing::error!("Handler list lock poisoned, dropping {} event", kind);
                return 0;
            }
        };

        let count = matched.len();
        tracing::debug!("Dispatching {} event to {} handler(s)", kind, count);

        let mut tasks = JoinSet::new();
        for (id, handler) in matched {
            let fut = handler(event.clone());
            tasks.spawn(async move { (id, fut.await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((id, Err(e))) => tracing::warn!("Handler {} failed: {}", id, e),
                Err(e) => tracing::error!("Handler task panicked: {}", e),
            }
        }

        count
    }

    /// Turn a console line into an event.
    ///
    /// `@<user_id> text` arrives as a private message from that user; any
    /// other line is an outgoing message typed by the logged-in account.
    pub fn event_from_line(&self, line: &str) -> Option<Event> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if let Some(rest) = line.strip_prefix('@') {
            let (id, text) = rest.split_once(char::is_whitespace)?;
            let user_id: i64 = id.parse().ok()?;
            let message = Message::new(self.next_message_id(), Chat::private(user_id))
                .with_sender(User::new(user_id))
                .with_text(text.trim());
            return Some(message.into());
        }

        let message = Message::new(self.next_message_id(), Chat::private(self.me.id))
            .with_sender(self.me.clone())
            .with_text(line)
            .outgoing();
        Some(message.into())
    }

    /// Snapshot of every outbound action so far
    pub fn outbox(&self) -> Vec<OutboundAction> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// Texts of sent and edited messages, in order
    pub fn texts(&self) -> Vec<String> {
        self.outbox()
            .iter()
            .filter_map(|a| a.text().map(|t| t.to_string()))
            .collect()
    }

    pub fn is_blocked(&self, user_id: i64) -> bool {
        self.blocked.lock().map(|b| b.contains(&user_id)).unwrap_or(false)
    }

    fn record(&self, action: OutboundAction) {
        if self.echo {
            match &action {
                OutboundAction::Send { chat_id, text, .. } => println!("[BOT -> {}] {}", chat_id, text),
                OutboundAction::Edit { chat_id, message_id, text } => {
                    println!("[BOT edit {}:{}] {}", chat_id, message_id, text)
                }
                other => println!("[BOT] {:?}", other),
            }
        }
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.push(action);
        }
    }
}

#[async_trait]
impl EventGateway for ConsoleGateway {
    fn add_handler(&self, kind: EventKind, filter: Filter, handler: EventHandler) -> Result<HandlerId, GatewayError> {
        let id = HandlerId(self.next_handler_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| GatewayError::HandlerRejected("handler list lock poisoned".to_string()))?;
        handlers.push(InstalledHandler {
            id,
            kind,
            filter,
            handler,
        });
        Ok(id)
    }

    fn remove_handler(&self, id: HandlerId) -> Result<(), GatewayError> {
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| GatewayError::HandlerRejected("handler list lock poisoned".to_string()))?;
        let before = handlers.len();
        handlers.retain(|h| h.id != id);
        if handlers.len() == before {
            return Err(GatewayError::UnknownHandler(id.0));
        }
        Ok(())
    }

    fn handler_count(&self) -> usize {
        self.handlers.read().map(|h| h.len()).unwrap_or(0)
    }

    async fn me(&self) -> Result<User, GatewayError> {
        Ok(self.me.clone())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, GatewayError> {
        if self.is_blocked(chat_id) {
            return Err(GatewayError::UserBlocked(chat_id));
        }
        let message_id = self.next_message_id();
        self.record(OutboundAction::Send {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        Ok(message_id)
    }

    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), GatewayError> {
        self.record(OutboundAction::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), GatewayError> {
        self.record(OutboundAction::Delete { chat_id, message_id });
        Ok(())
    }

    async fn block_user(&self, user_id: i64) -> Result<(), GatewayError> {
        if let Ok(mut blocked) = self.blocked.lock() {
            blocked.insert(user_id);
        }
        self.record(OutboundAction::Block(user_id));
        Ok(())
    }

    async fn unblock_user(&self, user_id: i64) -> Result<(), GatewayError> {
        if let Ok(mut blocked) = self.blocked.lock() {
            blocked.remove(&user_id);
        }
        self.record(OutboundAction::Unblock(user_id));
        Ok(())
    }
}
