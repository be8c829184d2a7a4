//! PM permit plugin - guards private messages from users that were not approved
//!
//! Every message from an unknown user earns a warning. Up to the configured
//! limit the user gets the permit message with a `Warning n/limit` line; past
//! it the user is blocked and the block is logged.

use async_trait::async_trait;

use super::{reply_usage, target_user};
use crate::application::errors::{BotError, GatewayError};
use crate::application::messaging::Filter;
use crate::domain::entities::{LogLevel, Message, User};
use crate::domain::traits::GLOBAL_SCOPE;
use crate::plugins::{HandlerSpec, Plugin, PluginContext, PluginInfo};

const SETTINGS_PLUGIN: &str = "pm_permit";
const ENABLED_KEY: &str = "enabled";

pub struct PmPermitPlugin;

impl PmPermitPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PmPermitPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for PmPermitPlugin {
    fn name(&self) -> &str {
        "pm_permit"
    }

    fn info(&self) -> PluginInfo {
        PluginInfo::new("pm_permit")
            .with_display_name("PM Permit")
            .with_description("Private message auto-approval system")
            .with_version("1.0.0")
            .with_commands(["approve", "disapprove", "block", "unblock", "pmguard"])
    }

    async fn init(&self, ctx: &PluginContext) -> Result<(), BotError> {
        let enabled = is_enabled(ctx).await?;
        tracing::debug!("PM permit guard is {}", if enabled { "on" } else { "off" });
        Ok(())
    }

    fn handlers(&self, ctx: &PluginContext) -> Vec<HandlerSpec> {
        let prefix = ctx.prefix().to_string();
        let command = |name: &str| Filter::command([name], &prefix) & Filter::Me;

        vec![
            message_handler(ctx, Filter::Private & !Filter::Me & !Filter::Service, Action::Guard),
            message_handler(ctx, command("approve"), Action::Approve),
            message_handler(ctx, command("disapprove"), Action::Disapprove),
            message_handler(ctx, command("block"), Action::Block),
            message_handler(ctx, command("unblock"), Action::Unblock),
            message_handler(ctx, command("pmguard"), Action::Toggle),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Guard,
    Approve,
    Disapprove,
    Block,
    Unblock,
    Toggle,
}

fn message_handler(ctx: &PluginContext, filter: Filter, action: Action) -> HandlerSpec {
    let ctx = ctx.clone();
    HandlerSpec::message(filter, move |message| {
        let ctx = ctx.clone();
        async move {
            match action {
                Action::Guard => guard(&ctx, message).await,
                Action::Approve => approve(&ctx, message).await,
                Action::Disapprove => disapprove(&ctx, message).await,
                Action::Block => block(&ctx, message).await,
                Action::Unblock => unblock(&ctx, message).await,
                Action::Toggle => toggle(&ctx, message).await,
            }
        }
    })
}

/// Stored toggle wins over the configured default
async fn is_enabled(ctx: &PluginContext) -> Result<bool, BotError> {
    let stored = ctx
        .store
        .get_setting(SETTINGS_PLUGIN, ENABLED_KEY, GLOBAL_SCOPE)
        .await?;
    Ok(match stored.as_deref() {
        Some("true") => true,
        Some("false") => false,
        _ => ctx.config.pm_permit.enabled,
    })
}

/// Permit message text for the n-th warning
pub fn warning_text(message: &str, warnings: u32, limit: u32) -> String {
    let mut text = format!("{}\n\nWarning {}/{}", message, warnings, limit);
    if warnings == limit {
        text.push_str("\nNext message will result in a block!");
    }
    text
}

fn describe(user: &User) -> String {
    format!(
        "Name: {}\nUsername: @{}\nID: {}",
        user.first_name.as_deref().unwrap_or("Unknown"),
        user.username.as_deref().unwrap_or("None"),
        user.id
    )
}

async fn guard(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    if !is_enabled(ctx).await? {
        return Ok(());
    }
    let Some(user) = message.from.clone() else {
        return Ok(());
    };

    let approved = ctx
        .store
        .approval(user.id)
        .await?
        .map(|r| r.approved)
        .unwrap_or(false);
    if approved {
        ctx.store.record_activity(&user, 1, 0).await?;
        return Ok(());
    }

    ctx.store.touch_approval(&user).await?;
    let warnings = ctx.store.add_warning(user.id).await?;
    let limit = ctx.config.pm_permit.limit;

    if warnings <= limit {
        let text = warning_text(&ctx.config.pm_permit.message, warnings, limit);
        match ctx.gateway.send_message(message.chat.id, &text).await {
            Ok(_) | Err(GatewayError::UserBlocked(_)) | Err(GatewayError::PeerInvalid(_)) => {}
            Err(e) => return Err(e.into()),
        }
        return Ok(());
    }

    if let Err(e) = ctx.gateway.block_user(user.id).await {
        ctx.log(
            LogLevel::Error,
            &format!("Failed to block user {}: {}", user.id, e),
            Some(user.id),
            None,
        )
        .await;
        return Ok(());
    }

    ctx.log(
        LogLevel::Info,
        &format!("Blocked user {} for exceeding PM limit", user),
        Some(user.id),
        None,
    )
    .await;
    tracing::info!("Blocked user {} after {} warnings", user.id, warnings);

    if let Some(log_chat) = ctx.config.bot.log_chat_id {
        let notice = format!(
            "User Blocked\n\n{}\nReason: Exceeded PM permit limit ({} warnings)",
            describe(&user),
            warnings
        );
        if let Err(e) = ctx.gateway.send_message(log_chat, &notice).await {
            tracing::warn!("Failed to notify log chat {}: {}", log_chat, e);
        }
    }
    Ok(())
}

async fn approve(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    ctx.record_command(&message).await;
    let Some(target) = ctx.command(&message).and_then(|c| target_user(&message, &c)) else {
        return reply_usage(ctx, &message, "approve <user_id> or reply to a message").await;
    };

    let approved_by = match &message.from {
        Some(user) => user.id,
        None => ctx.gateway.me().await?.id,
    };
    ctx.store.approve(target.id, approved_by).await?;

    if let Err(e) = ctx
        .gateway
        .send_message(target.id, "You have been approved for PM!\n\nYou can now send messages freely.")
        .await
    {
        tracing::debug!("Could not notify approved user {}: {}", target.id, e);
    }

    ctx.reply(&message, &format!("User Approved\n\n{}", describe(&target)))
        .await?;
    ctx.log(LogLevel::Info, &format!("Approved user {}", target), Some(target.id), None)
        .await;
    Ok(())
}

async fn disapprove(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    ctx.record_command(&message).await;
    let Some(target) = ctx.command(&message).and_then(|c| target_user(&message, &c)) else {
        return reply_usage(ctx, &message, "disapprove <user_id> or reply to a message").await;
    };

    ctx.store.disapprove(target.id).await?;
    ctx.reply(&message, &format!("User Disapproved\n\n{}", describe(&target)))
        .await?;
    ctx.log(LogLevel::Info, &format!("Disapproved user {}", target), Some(target.id), None)
        .await;
    Ok(())
}

async fn block(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    ctx.record_command(&message).await;
    let Some(target) = ctx.command(&message).and_then(|c| target_user(&message, &c)) else {
        return reply_usage(ctx, &message, "block <user_id> or reply to a message").await;
    };

    ctx.gateway.block_user(target.id).await?;
    ctx.reply(&message, &format!("User Blocked\n\n{}", describe(&target)))
        .await?;
    ctx.log(LogLevel::Info, &format!("Blocked user {}", target), Some(target.id), None)
        .await;
    Ok(())
}

async fn unblock(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    ctx.record_command(&message).await;
    let Some(target) = ctx.command(&message).and_then(|c| target_user(&message, &c)) else {
        return reply_usage(ctx, &message, "unblock <user_id>").await;
    };

    ctx.gateway.unblock_user(target.id).await?;
    ctx.reply(&message, &format!("User Unblocked\n\n{}", describe(&target)))
        .await?;
    ctx.log(LogLevel::Info, &format!("Unblocked user {}", target), Some(target.id), None)
        .await;
    Ok(())
}

async fn toggle(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    ctx.record_command(&message).await;
    let command = ctx.command(&message);
    let requested = command.as_ref().and_then(|c| c.arg(0)).map(|a| a.to_lowercase());

    let enabled = match requested.as_deref() {
        Some("on") | Some("enable") | Some("true") => true,
        Some("off") | Some("disable") | Some("false") => false,
        Some(_) => return reply_usage(ctx, &message, "pmguard [on/off]").await,
        None => !is_enabled(ctx).await?,
    };

    ctx.store
        .set_setting(SETTINGS_PLUGIN, ENABLED_KEY, if enabled { "true" } else { "false" }, GLOBAL_SCOPE)
        .await?;

    let text = format!(
        "PM Guard {}\n\nStatus: {}\nWarning Limit: {}",
        if enabled { "Enabled" } else { "Disabled" },
        if enabled { "Active" } else { "Inactive" },
        ctx.config.pm_permit.limit
    );
    ctx.reply(&message, &text).await
}
