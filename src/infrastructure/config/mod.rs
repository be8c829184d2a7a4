//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;

const DEFAULT_PM_PERMIT_MESSAGE: &str = "PM PERMIT ACTIVATED\n\n\
You are not approved to PM me.\n\
Please wait for approval or contact me in a group.";

const DEFAULT_ALIVE_MESSAGE: &str = "UserBot is Alive!\n\n\
System Status: Online\n\
Uptime: {uptime}\n\
Version: {version}\n\
Ping: {ping}ms";

/// Agent configuration, read once at startup
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub plugins: PluginConfig,
    pub pm_permit: PmPermitConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    /// Command prefix, e.g. `.` for `.ping`
    pub prefix: String,
    /// Chat receiving startup notices and block reports
    pub log_chat_id: Option<i64>,
    /// Supports `{uptime}`, `{ping}` and `{version}` placeholders
    pub alive_message: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PluginConfig {
    /// Plugin names never loaded by `load_all` (case-insensitive)
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PmPermitConfig {
    pub enabled: bool,
    /// Warnings before an unapproved user is blocked
    pub limit: u32,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl PluginConfig {
    /// Case-insensitive match against the disabled list, ignoring surrounding whitespace
    pub fn is_disabled(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.disabled.iter().any(|d| d.trim().to_lowercase() == name)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "userbot".to_string(),
            prefix: ".".to_string(),
            log_chat_id: None,
            alive_message: DEFAULT_ALIVE_MESSAGE.to_string(),
        }
    }
}

impl Default for PmPermitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 5,
            message: DEFAULT_PM_PERMIT_MESSAGE.to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:///userbot.db".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    /// Apply `BOT_PREFIX`, `DISABLED_PLUGINS`, `LOG_CHAT_ID`, `DATABASE_URL`,
    /// `PM_PERMIT_*` and `ALIVE_MESSAGE` overrides from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(prefix) = lookup("BOT_PREFIX") {
            self.bot.prefix = prefix;
        }

        if let Some(log_chat) = lookup("LOG_CHAT_ID") {
            // An unparsable chat id is ignored rather than fatal
            self.bot.log_chat_id = log_chat.trim().parse().ok();
        }

        if let Some(message) = lookup("ALIVE_MESSAGE") {
            self.bot.alive_message = message;
        }

        if let Some(disabled) = lookup("DISABLED_PLUGINS") {
            self.plugins.disabled = parse_list(&disabled);
        }

        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(enabled) = lookup("PM_PERMIT_ENABLED") {
            self.pm_permit.enabled = enabled.trim().eq_ignore_ascii_case("true");
        }

        if let Some(limit) = lookup("PM_PERMIT_LIMIT") {
            self.pm_permit.limit = limit
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("PM_PERMIT_LIMIT={}", limit)))?;
        }

        if let Some(message) = lookup("PM_PERMIT_MESSAGE") {
            self.pm_permit.message = message;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.trim().is_empty() {
            return Err(ConfigError::MissingField("bot.prefix".to_string()));
        }
        if self.pm_permit.limit == 0 {
            return Err(ConfigError::InvalidValue("pm-permit.limit must be at least 1".to_string()));
        }
        Ok(())
    }

    /// SQLite file path from `database.url`
    pub fn db_path(&self) -> PathBuf {
        match self.database.url.strip_prefix("sqlite:///") {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from("userbot.db"),
        }
    }
}

/// Parse comma-separated string to list
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect()
}
