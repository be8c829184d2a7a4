//! Utils plugin - help, plugin administration and log viewer

use std::sync::Arc;

use super::reply_usage;
use crate::application::errors::{BotError, PluginError};
use crate::application::messaging::Filter;
use crate::domain::entities::{LogEntry, Message};
use crate::plugins::{HandlerSpec, Plugin, PluginContext, PluginInfo, PluginManager, PluginStatus};

const DEFAULT_LOG_LIMIT: usize = 10;
const MAX_LOG_LIMIT: usize = 20;
const LOG_PREVIEW_CHARS: usize = 100;

pub struct UtilsPlugin;

impl UtilsPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UtilsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for UtilsPlugin {
    fn name(&self) -> &str {
        "utils"
    }

    fn info(&self) -> PluginInfo {
        PluginInfo::new("utils")
            .with_display_name("Utils")
            .with_description("Utility commands")
            .with_version("1.0.0")
            .with_commands(["help", "plugins", "load", "unload", "reload", "logs"])
    }

    fn handlers(&self, ctx: &PluginContext) -> Vec<HandlerSpec> {
        vec![
            command_handler(ctx, &["help"], Action::Help),
            command_handler(ctx, &["plugins"], Action::Plugins),
            command_handler(ctx, &["load"], Action::Load),
            command_handler(ctx, &["unload"], Action::Unload),
            command_handler(ctx, &["reload"], Action::Reload),
            command_handler(ctx, &["logs"], Action::Logs),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Help,
    Plugins,
    Load,
    Unload,
    Reload,
    Logs,
}

fn command_handler(ctx: &PluginContext, names: &[&str], action: Action) -> HandlerSpec {
    let filter = Filter::command(names.iter().copied(), ctx.prefix()) & Filter::Me;
    let ctx = ctx.clone();
    HandlerSpec::message(filter, move |message| {
        let ctx = ctx.clone();
        async move {
            ctx.record_command(&message).await;
            match action {
                Action::Help => help(&ctx, message).await,
                Action::Plugins => plugins(&ctx, message).await,
                Action::Load | Action::Unload | Action::Reload => lifecycle(&ctx, message, action).await,
                Action::Logs => logs(&ctx, message).await,
            }
        }
    })
}

fn manager(ctx: &PluginContext) -> Result<Arc<PluginManager>, BotError> {
    ctx.plugins()
        .ok_or_else(|| BotError::Internal("plugin manager is gone".to_string()))
}

async fn help(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    let manager = manager(ctx)?;
    let prefix = ctx.prefix();

    let mut text = format!("UserBot Help\n\nPrefix: {}\n", prefix);
    for status in manager.list() {
        let title = status.info.display_name.as_deref().unwrap_or(&status.name);
        let commands: Vec<String> = status
            .info
            .commands
            .iter()
            .map(|c| format!("{}{}", prefix, c))
            .collect();
        text.push_str(&format!("\n{}: {}", title, commands.join(", ")));
    }
    ctx.reply(&message, &text).await
}

/// One line per module for the `plugins` listing
pub fn describe_status(status: &PluginStatus) -> String {
    let state = if status.loaded {
        "loaded"
    } else if status.disabled {
        "disabled"
    } else {
        "not loaded"
    };
    let mut line = format!("[{}] {} ({} handlers)", state, status.name, status.handlers);
    if let Some(description) = &status.info.description {
        line.push_str(&format!(" - {}", description));
    }
    line
}

async fn plugins(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    let manager = manager(ctx)?;
    let catalog = manager.catalog();
    let loaded = catalog.iter().filter(|s| s.loaded).count();

    let mut text = String::from("Plugins\n");
    for status in &catalog {
        text.push('\n');
        text.push_str(&describe_status(status));
    }
    text.push_str(&format!(
        "\n\nTotal: {}/{} loaded, {} handlers",
        loaded,
        catalog.len(),
        manager.total_handlers()
    ));
    ctx.reply(&message, &text).await
}

async fn lifecycle(ctx: &PluginContext, message: Message, action: Action) -> Result<(), BotError> {
    let (verb, done) = match action {
        Action::Load => ("load", "Loaded"),
        Action::Unload => ("unload", "Unloaded"),
        _ => ("reload", "Reloaded"),
    };
    let Some(name) = ctx.command(&message).and_then(|c| c.arg(0).map(|s| s.to_lowercase())) else {
        return reply_usage(ctx, &message, &format!("{} <plugin>", verb)).await;
    };

    let manager = manager(ctx)?;
    let result: Result<(), PluginError> = match action {
        Action::Load => manager.load(&name).await,
        Action::Unload => manager.unload(&name).await,
        _ => manager.reload(&name).await,
    };

    let text = match result {
        Ok(()) => format!(
            "{} plugin: {} ({} handlers)",
            done,
            name,
            manager.handler_count(&name)
        ),
        Err(e) => format!("Failed to {} {}: {}", verb, name, e),
    };
    ctx.reply(&message, &text).await
}

/// Render one log entry, truncating long messages
pub fn format_log(entry: &LogEntry) -> String {
    let mut preview: String = entry.message.chars().take(LOG_PREVIEW_CHARS).collect();
    if entry.message.chars().count() > LOG_PREVIEW_CHARS {
        preview.push_str("...");
    }
    format!("{} {}\n  {}", entry.timestamp.format("%H:%M:%S"), entry.level, preview)
}

async fn logs(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    let limit = ctx
        .command(&message)
        .and_then(|c| c.arg(0).and_then(|a| a.parse::<usize>().ok()))
        .map(|n| n.clamp(1, MAX_LOG_LIMIT))
        .unwrap_or(DEFAULT_LOG_LIMIT);

    let entries = ctx.store.recent_logs(limit).await?;
    let mut text = format!("Recent Logs (Last {})\n", limit);
    if entries.is_empty() {
        text.push_str("\nNo logs available.");
    }
    for entry in &entries {
        text.push('\n');
        text.push_str(&format_log(entry));
    }
    ctx.reply(&message, &text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::LogLevel;
    use chrono::Utc;

    #[test]
    fn test_format_log_truncates() {
        let entry = LogEntry {
            id: 1,
            level: LogLevel::Info,
            message: "x".repeat(150),
            user_id: None,
            chat_id: None,
            timestamp: Utc::now(),
        };
        let line = format_log(&entry);
        assert!(line.contains("INFO"));
        assert!(line.ends_with(&format!("{}...", "x".repeat(100))));
    }

    #[test]
    fn test_describe_status() {
        let status = PluginStatus {
            name: "ping".to_string(),
            loaded: false,
            disabled: true,
            handlers: 0,
            info: PluginInfo::new("ping").with_description("Latency"),
        };
        assert_eq!(describe_status(&status), "[disabled] ping (0 handlers) - Latency");
    }
}
