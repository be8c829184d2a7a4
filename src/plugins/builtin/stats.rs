//! Stats plugin - usage counters

use crate::application::errors::BotError;
use crate::application::messaging::Filter;
use crate::domain::entities::{LogLevel, Message, UserStats};
use crate::plugins::{HandlerSpec, Plugin, PluginContext, PluginInfo};

/// Log entries summarized by `usage`
const USAGE_LOG_WINDOW: usize = 100;

pub struct StatsPlugin;

impl StatsPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StatsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for StatsPlugin {
    fn name(&self) -> &str {
        "stats"
    }

    fn info(&self) -> PluginInfo {
        PluginInfo::new("stats")
            .with_display_name("Stats")
            .with_description("Usage statistics")
            .with_version("1.0.0")
            .with_commands(["mystats", "usage"])
    }

    fn handlers(&self, ctx: &PluginContext) -> Vec<HandlerSpec> {
        let mine_ctx = ctx.clone();
        let usage_ctx = ctx.clone();
        vec![
            HandlerSpec::message(Filter::command(["mystats"], ctx.prefix()) & Filter::Me, move |message| {
                let ctx = mine_ctx.clone();
                async move { my_stats(&ctx, message).await }
            }),
            HandlerSpec::message(Filter::command(["usage"], ctx.prefix()) & Filter::Me, move |message| {
                let ctx = usage_ctx.clone();
                async move { usage(&ctx, message).await }
            }),
        ]
    }
}

/// Share of messages that were commands, in percent
pub fn command_rate(stats: &UserStats) -> Option<f64> {
    if stats.total_messages == 0 {
        return None;
    }
    Some(stats.commands_used as f64 / stats.total_messages as f64 * 100.0)
}

async fn my_stats(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    let user_id = match message.sender_id() {
        Some(id) => id,
        None => ctx.gateway.me().await?.id,
    };

    let mut text = String::from("Your Statistics\n\n");
    match ctx.store.user_stats(user_id).await? {
        Some(stats) => {
            text.push_str(&format!(
                "Messages Sent: {}\nCommands Used: {}",
                stats.total_messages, stats.commands_used
            ));
            if let Some(seen) = stats.last_seen {
                text.push_str(&format!("\nLast Active: {}", seen.format("%Y-%m-%d %H:%M:%S UTC")));
            }
            if let Some(rate) = command_rate(&stats) {
                text.push_str(&format!("\nCommand Usage Rate: {:.1}%", rate));
            }
        }
        None => text.push_str("No statistics available yet."),
    }

    if let Some(approval) = ctx.store.approval(user_id).await? {
        text.push_str(&format!(
            "\n\nPM Permit: {}\nWarnings: {}",
            if approval.approved { "Approved" } else { "Not Approved" },
            approval.warnings
        ));
    }

    ctx.reply(&message, &text).await?;
    ctx.record_command(&message).await;
    Ok(())
}

async fn usage(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    // Count this call before reading the counters back
    ctx.record_command(&message).await;

    let mut text = String::from("Usage Analytics\n\n");
    if let Some(id) = message.sender_id() {
        let commands = ctx
            .store
            .user_stats(id)
            .await?
            .map(|s| s.commands_used)
            .unwrap_or(0);
        text.push_str(&format!("Commands Used: {}\n", commands));
    }

    let logs = ctx.store.recent_logs(USAGE_LOG_WINDOW).await?;
    text.push_str(&format!("\nRecent Logs (last {}):", logs.len()));
    for level in [LogLevel::Error, LogLevel::Warning, LogLevel::Info, LogLevel::Debug] {
        let count = logs.iter().filter(|entry| entry.level == level).count();
        if count > 0 {
            text.push_str(&format!("\n{}: {}", level, count));
        }
    }

    ctx.reply(&message, &text).await
}
