//! Alive plugin - status and uptime

use chrono::{DateTime, Utc};
use std::time::Instant;

use super::format_duration;
use crate::application::errors::BotError;
use crate::application::messaging::Filter;
use crate::domain::entities::Message;
use crate::plugins::{HandlerSpec, Plugin, PluginContext, PluginInfo};

/// Reports that the bot is up, with uptime measured from plugin load
pub struct AlivePlugin {
    started: Instant,
    started_at: DateTime<Utc>,
}

impl AlivePlugin {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

impl Default for AlivePlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for AlivePlugin {
    fn name(&self) -> &str {
        "alive"
    }

    fn info(&self) -> PluginInfo {
        PluginInfo::new("alive")
            .with_display_name("Alive")
            .with_description("Show userbot status and uptime")
            .with_version("1.0.0")
            .with_commands(["alive", "up", "uptime"])
    }

    fn handlers(&self, ctx: &PluginContext) -> Vec<HandlerSpec> {
        let started = self.started;
        let started_at = self.started_at;

        let alive_ctx = ctx.clone();
        let uptime_ctx = ctx.clone();
        vec![
            HandlerSpec::message(
                Filter::command(["alive", "up"], ctx.prefix()) & Filter::Me,
                move |message| {
                    let ctx = alive_ctx.clone();
                    async move { alive(&ctx, started, message).await }
                },
            ),
            HandlerSpec::message(Filter::command(["uptime"], ctx.prefix()) & Filter::Me, move |message| {
                let ctx = uptime_ctx.clone();
                async move { uptime(&ctx, started, started_at, message).await }
            }),
        ]
    }
}

/// Fill `{uptime}`, `{ping}` and `{version}` in the alive template
pub fn render_alive(template: &str, uptime: &str, ping_ms: f64) -> String {
    template
        .replace("{uptime}", uptime)
        .replace("{ping}", &format!("{:.1}", ping_ms))
        .replace("{version}", env!("CARGO_PKG_VERSION"))
}

async fn alive(ctx: &PluginContext, started: Instant, message: Message) -> Result<(), BotError> {
    let ping_start = Instant::now();
    ctx.reply(&message, "Calculating ping...").await?;
    let ping_ms = ping_start.elapsed().as_secs_f64() * 1000.0;

    let text = render_alive(
        &ctx.config.bot.alive_message,
        &format_duration(started.elapsed()),
        ping_ms,
    );
    ctx.reply(&message, &text).await?;
    ctx.record_command(&message).await;
    Ok(())
}

async fn uptime(
    ctx: &PluginContext,
    started: Instant,
    started_at: DateTime<Utc>,
    message: Message,
) -> Result<(), BotError> {
    let text = format!(
        "Uptime Information\n\nBot Uptime: {}\nStarted: {}",
        format_duration(started.elapsed()),
        started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    ctx.reply(&message, &text).await?;
    ctx.record_command(&message).await;
    Ok(())
}
