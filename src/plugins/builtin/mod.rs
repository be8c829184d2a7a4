//! Built-in feature modules

pub mod alive;
pub mod info;
pub mod ping;
pub mod pm_permit;
pub mod stats;
pub mod utils;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::time::Duration;

use super::context::PluginContext;
use super::registry::PluginCatalog;
use crate::application::errors::BotError;
use crate::application::messaging::ParsedCommand;
use crate::domain::entities::{Message, User};

pub use alive::AlivePlugin;
pub use info::InfoPlugin;
pub use ping::PingPlugin;
pub use pm_permit::PmPermitPlugin;
pub use stats::StatsPlugin;
pub use utils::UtilsPlugin;

/// Catalog of every built-in module, in discovery order
pub fn catalog() -> PluginCatalog {
    PluginCatalog::new()
        .register("alive", AlivePlugin::new)
        .register("info", InfoPlugin::new)
        .register("ping", PingPlugin::new)
        .register("pm_permit", PmPermitPlugin::new)
        .register("stats", StatsPlugin::new)
        .register("utils", UtilsPlugin::new)
}

static USER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:tg://user\?id=)?(-?\d+)$").unwrap());

/// Parse a numeric user id, optionally in `tg://user?id=` form
pub fn parse_user_id(input: &str) -> Option<i64> {
    USER_ID
        .captures(input.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Command target: sender of the replied-to message, else the first argument
pub fn target_user(message: &Message, command: &ParsedCommand) -> Option<User> {
    if let Some(user) = message.reply_to.as_ref().and_then(|r| r.from.clone()) {
        return Some(user);
    }
    command.arg(0).and_then(parse_user_id).map(User::new)
}

/// Human readable duration, e.g. `1d 2h 3m` or `4m 5s`
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    // Seconds only matter below a day
    if seconds > 0 && days == 0 {
        parts.push(format!("{}s", seconds));
    }

    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}

/// Shared usage reply for commands given a bad argument list
pub(crate) async fn reply_usage(ctx: &PluginContext, message: &Message, usage: &str) -> Result<(), BotError> {
    ctx.reply(message, &format!("Usage: {}{}", ctx.prefix(), usage)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::CommandParser;
    use crate::domain::entities::Chat;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
        assert_eq!(format_duration(Duration::from_secs(3_600)), "1h");
        assert_eq!(format_duration(Duration::from_secs(90_061)), "1d 1h 1m");
    }

    #[test]
    fn test_parse_user_id() {
        assert_eq!(parse_user_id("42"), Some(42));
        assert_eq!(parse_user_id("tg://user?id=7"), Some(7));
        assert_eq!(parse_user_id("-100"), Some(-100));
        assert_eq!(parse_user_id("@someone"), None);
    }

    #[test]
    fn test_target_prefers_reply() {
        let parser = CommandParser::new(".");
        let replied = Message::new(1, Chat::private(5)).with_sender(User::new(5));
        let message = Message::new(2, Chat::private(5))
            .with_text(".approve 9")
            .with_reply_to(replied);
        let command = parser.parse_message(&message).unwrap();

        assert_eq!(target_user(&message, &command).map(|u| u.id), Some(5));

        let plain = Message::new(3, Chat::private(5)).with_text(".approve 9");
        let command = parser.parse_message(&plain).unwrap();
        assert_eq!(target_user(&plain, &command).map(|u| u.id), Some(9));
    }

    #[test]
    fn test_catalog_order() {
        assert_eq!(
            catalog().names(),
            vec!["alive", "info", "ping", "pm_permit", "stats", "utils"]
        );
    }
}
