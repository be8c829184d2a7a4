//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Plugin lifecycle errors
#[derive(Error, Debug)]
pub enum PluginError {
    /// Load attempted on a module that is already loaded
    #[error("Plugin '{0}' is already loaded")]
    AlreadyLoaded(String),

    /// Target is not loaded, or no such module exists in the catalog
    #[error("Plugin '{0}' not found")]
    NotFound(String),

    #[error("Plugin '{name}' init failed: {reason}")]
    InitFailure { name: String, reason: String },

    #[error("Plugin '{name}' handler install failed: {reason}")]
    HandlerInstallFailure { name: String, reason: String },

    #[error("Plugin '{name}' cleanup failed: {reason}")]
    CleanupFailure { name: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PluginError {
    pub fn init(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InitFailure {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn install(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::HandlerInstallFailure {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn cleanup(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::CleanupFailure {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PluginError::NotFound(_))
    }
}

/// Event gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Handler rejected: {0}")]
    HandlerRejected(String),

    #[error("Unknown handler: {0}")]
    UnknownHandler(u64),

    #[error("Peer invalid: {0}")]
    PeerInvalid(i64),

    #[error("User is blocked: {0}")]
    UserBlocked(i64),
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Lock poisoned")]
    Poisoned,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
