//! userbot - plugin-driven automation for a personal chat account
//!
//! Layers:
//! - `domain`: entities and the gateway/store capabilities
//! - `application`: errors, filters, command parsing
//! - `infrastructure`: config, SQLite and in-memory stores, console gateway
//! - `plugins`: plugin lifecycle and the built-in feature modules

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;

pub use application::errors::{BotError, PluginError};
pub use plugins::{PluginContext, PluginManager};
