//! Info plugin - ids and stored records of users

use super::target_user;
use crate::application::errors::BotError;
use crate::application::messaging::Filter;
use crate::domain::entities::{Message, User};
use crate::plugins::{HandlerSpec, Plugin, PluginContext, PluginInfo};

pub struct InfoPlugin;

impl InfoPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InfoPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for InfoPlugin {
    fn name(&self) -> &str {
        "info"
    }

    fn info(&self) -> PluginInfo {
        PluginInfo::new("info")
            .with_display_name("Info")
            .with_description("User and chat information")
            .with_version("1.0.0")
            .with_commands(["id", "info"])
    }

    fn handlers(&self, ctx: &PluginContext) -> Vec<HandlerSpec> {
        let id_ctx = ctx.clone();
        let info_ctx = ctx.clone();
        vec![
            HandlerSpec::message(Filter::command(["id"], ctx.prefix()) & Filter::Me, move |message| {
                let ctx = id_ctx.clone();
                async move { ids(&ctx, message).await }
            }),
            HandlerSpec::message(Filter::command(["info"], ctx.prefix()) & Filter::Me, move |message| {
                let ctx = info_ctx.clone();
                async move { user_info(&ctx, message).await }
            }),
        ]
    }
}

async fn ids(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    let mut text = format!("ID Information\n\nChat ID: {}", message.chat.id);
    if let Some(id) = message.sender_id() {
        text.push_str(&format!("\nYour ID: {}", id));
    }
    if let Some(replied) = &message.reply_to {
        text.push_str(&format!("\nReplied Message ID: {}", replied.id));
        if let Some(id) = replied.sender_id() {
            text.push_str(&format!("\nReplied User ID: {}", id));
        }
    }
    ctx.reply(&message, &text).await?;
    ctx.record_command(&message).await;
    Ok(())
}

async fn user_info(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    let target = match ctx.command(&message).and_then(|c| target_user(&message, &c)) {
        Some(user) => user,
        None => match &message.from {
            Some(user) => user.clone(),
            None => ctx.gateway.me().await?,
        },
    };

    let text = render_info(ctx, &target).await?;
    ctx.reply(&message, &text).await?;
    ctx.record_command(&message).await;
    Ok(())
}

async fn render_info(ctx: &PluginContext, user: &User) -> Result<String, BotError> {
    let mut text = format!("User Information\n\nName: {}\nID: {}", user.display_name(), user.id);
    if let Some(username) = &user.username {
        text.push_str(&format!("\nUsername: @{}", username));
    }
    if user.is_bot {
        text.push_str("\nBot: yes");
    }

    if let Some(stats) = ctx.store.user_stats(user.id).await? {
        text.push_str(&format!(
            "\n\nMessages: {}\nCommands: {}",
            stats.total_messages, stats.commands_used
        ));
        if let Some(seen) = stats.last_seen {
            text.push_str(&format!("\nLast Seen: {}", seen.format("%Y-%m-%d %H:%M:%S UTC")));
        }
    }

    if let Some(approval) = ctx.store.approval(user.id).await? {
        text.push_str(&format!(
            "\n\nPM Status: {}\nWarnings: {}",
            if approval.approved { "Approved" } else { "Not Approved" },
            approval.warnings
        ));
    }
    Ok(text)
}
