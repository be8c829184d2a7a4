use async_trait::async_trait;
use crate::application::errors::StorageError;
use crate::domain::entities::{ApprovalRecord, LogEntry, LogLevel, User, UserStats};

/// Settings stored with this user id apply to every user
pub const GLOBAL_SCOPE: i64 = 0;

/// Store trait - persistence capability consumed by plugins
#[async_trait]
pub trait Store: Send + Sync {
    // Plugin settings, scoped by (plugin, key, user id)
    async fn get_setting(&self, plugin: &str, key: &str, user_id: i64) -> Result<Option<String>, StorageError>;
    async fn set_setting(&self, plugin: &str, key: &str, value: &str, user_id: i64) -> Result<(), StorageError>;

    // Usage counters
    /// Add to the user's message and command counters and bump `last_seen`
    async fn record_activity(&self, user: &User, messages: u64, commands: u64) -> Result<(), StorageError>;
    async fn user_stats(&self, user_id: i64) -> Result<Option<UserStats>, StorageError>;

    // PM approval records
    async fn approval(&self, user_id: i64) -> Result<Option<ApprovalRecord>, StorageError>;
    /// Create the record if missing and refresh the profile fields; keeps approval and warnings
    async fn touch_approval(&self, user: &User) -> Result<(), StorageError>;
    async fn approve(&self, user_id: i64, approved_by: i64) -> Result<(), StorageError>;
    async fn disapprove(&self, user_id: i64) -> Result<(), StorageError>;
    /// Returns the warning count after the increment
    async fn add_warning(&self, user_id: i64) -> Result<u32, StorageError>;

    // Log entries
    async fn add_log(&self, level: LogLevel, message: &str, user_id: Option<i64>, chat_id: Option<i64>) -> Result<(), StorageError>;
    /// Newest first
    async fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>, StorageError>;
}
