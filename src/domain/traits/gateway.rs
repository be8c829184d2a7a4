use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::application::errors::{BotError, GatewayError};
use crate::application::messaging::Filter;
use crate::domain::entities::{Event, EventKind, User};

/// Future returned by an event handler
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), BotError>> + Send>>;

/// Callable invoked when an installed predicate matches an event
pub type EventHandler = Arc<dyn Fn(Event) -> HandlerFuture + Send + Sync>;

/// Opaque handle to a handler installed on a gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Event gateway - the live connection to the chat platform
///
/// Handler add/remove is synchronous: it only mutates the gateway's
/// in-memory handler list. Outbound actions go over the network.
#[async_trait]
pub trait EventGateway: Send + Sync {
    /// Attach a handler for one event kind
    fn add_handler(&self, kind: EventKind, filter: Filter, handler: EventHandler) -> Result<HandlerId, GatewayError>;

    /// Detach a previously added handler
    fn remove_handler(&self, id: HandlerId) -> Result<(), GatewayError>;

    /// Number of handlers currently attached
    fn handler_count(&self) -> usize;

    /// The account this gateway is logged in as
    async fn me(&self) -> Result<User, GatewayError>;

    /// Send a text message, returning the new message id
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, GatewayError>;

    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), GatewayError>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), GatewayError>;

    async fn block_user(&self, user_id: i64) -> Result<(), GatewayError>;

    async fn unblock_user(&self, user_id: i64) -> Result<(), GatewayError>;
}
