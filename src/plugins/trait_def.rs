//! Plugin trait definitions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

use super::context::PluginContext;
use crate::application::errors::BotError;
use crate::application::messaging::Filter;
use crate::domain::entities::{CallbackQuery, Event, EventKind, InlineQuery, Message};
use crate::domain::traits::{EventHandler, HandlerFuture};

/// Core plugin trait that all feature modules implement
///
/// A fresh instance is built for every load, so per-load state lives in the
/// plugin struct itself and is dropped on unload.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique lowercase identifier
    fn name(&self) -> &str;

    /// Optional: descriptive metadata for introspection
    fn info(&self) -> PluginInfo {
        PluginInfo::new(self.name())
    }

    /// Optional: called once on load, before any handler is installed
    async fn init(&self, _ctx: &PluginContext) -> Result<(), BotError> {
        Ok(())
    }

    /// Handlers to install, in declaration order
    fn handlers(&self, ctx: &PluginContext) -> Vec<HandlerSpec>;

    /// Optional: called once on unload, after all handlers are removed
    async fn cleanup(&self) -> Result<(), BotError> {
        Ok(())
    }
}

/// Builds a fresh plugin instance
pub type PluginFactory = Arc<dyn Fn() -> Arc<dyn Plugin> + Send + Sync>;

/// Plugin metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub commands: Vec<String>,
}

impl PluginInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands = commands.into_iter().map(|c| c.into()).collect();
        self
    }
}

/// One declared (event kind, filter, handler) binding
pub struct HandlerSpec {
    pub kind: EventKind,
    pub filter: Filter,
    pub handler: EventHandler,
}

impl HandlerSpec {
    pub fn new(kind: EventKind, filter: Filter, handler: EventHandler) -> Self {
        Self { kind, filter, handler }
    }

    /// Handler for messages matching `filter`
    pub fn message<F, Fut>(filter: Filter, handler: F) -> Self
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let handler: EventHandler = Arc::new(move |event: Event| -> HandlerFuture {
            match event {
                Event::Message(message) => Box::pin(handler(message)),
                _ => Box::pin(async { Ok(()) }),
            }
        });
        Self::new(EventKind::Message, filter, handler)
    }

    /// Handler for inline keyboard callbacks matching `filter`
    pub fn callback_query<F, Fut>(filter: Filter, handler: F) -> Self
    where
        F: Fn(CallbackQuery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let handler: EventHandler = Arc::new(move |event: Event| -> HandlerFuture {
            match event {
                Event::CallbackQuery(query) => Box::pin(handler(query)),
                _ => Box::pin(async { Ok(()) }),
            }
        });
        Self::new(EventKind::CallbackQuery, filter, handler)
    }

    /// Handler for inline queries matching `filter`
    pub fn inline_query<F, Fut>(filter: Filter, handler: F) -> Self
    where
        F: Fn(InlineQuery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let handler: EventHandler = Arc::new(move |event: Event| -> HandlerFuture {
            match event {
                Event::InlineQuery(query) => Box::pin(handler(query)),
                _ => Box::pin(async { Ok(()) }),
            }
        });
        Self::new(EventKind::InlineQuery, filter, handler)
    }
}

impl std::fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerSpec")
            .field("kind", &self.kind)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
