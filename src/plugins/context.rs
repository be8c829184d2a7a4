//! Collaborators handed to every plugin and captured by its handlers

use std::sync::{Arc, Weak};

use super::manager::PluginManager;
use crate::application::errors::BotError;
use crate::application::messaging::{CommandParser, ParsedCommand};
use crate::domain::entities::{LogLevel, Message};
use crate::domain::traits::{EventGateway, Store};
use crate::infrastructure::config::Config;

/// Shared collaborators for one plugin load
#[derive(Clone)]
pub struct PluginContext {
    pub gateway: Arc<dyn EventGateway>,
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    manager: Weak<PluginManager>,
}

impl PluginContext {
    pub fn new(gateway: Arc<dyn EventGateway>, store: Arc<dyn Store>, config: Arc<Config>) -> Self {
        Self {
            gateway,
            store,
            config,
            manager: Weak::new(),
        }
    }

    pub(crate) fn with_manager(mut self, manager: Weak<PluginManager>) -> Self {
        self.manager = manager;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.config.bot.prefix
    }

    /// Parse the command in a message using the configured prefix
    pub fn command(&self, message: &Message) -> Option<ParsedCommand> {
        CommandParser::new(self.prefix()).parse_message(message)
    }

    /// The plugin manager, while it is alive
    pub fn plugins(&self) -> Option<Arc<PluginManager>> {
        self.manager.upgrade()
    }

    /// Edit our own command message in place, or answer in the same chat
    pub async fn reply(&self, message: &Message, text: &str) -> Result<(), BotError> {
        if message.outgoing {
            self.gateway.edit_message(message.chat.id, message.id, text).await?;
        } else {
            self.gateway.send_message(message.chat.id, text).await?;
        }
        Ok(())
    }

    /// Count a command message for the sender; failures are only logged
    pub async fn record_command(&self, message: &Message) {
        if let Some(user) = &message.from {
            if let Err(e) = self.store.record_activity(user, 1, 1).await {
                tracing::warn!("Failed to record command usage for {}: {}", user.id, e);
            }
        }
    }

    /// Append to the store log; failures are only logged
    pub async fn log(&self, level: LogLevel, text: &str, user_id: Option<i64>, chat_id: Option<i64>) {
        if let Err(e) = self.store.add_log(level, text, user_id, chat_id).await {
            tracing::warn!("Failed to add log entry: {}", e);
        }
    }
}
