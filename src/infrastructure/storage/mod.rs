//! In-memory storage implementation

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::entities::{ApprovalRecord, LogEntry, LogLevel, User, UserStats};
use crate::domain::traits::Store;

/// Volatile store for development and tests
#[derive(Default)]
pub struct MemoryStore {
    settings: RwLock<HashMap<(String, String, i64), String>>,
    stats: RwLock<HashMap<i64, UserStats>>,
    approvals: RwLock<HashMap<i64, ApprovalRecord>>,
    logs: RwLock<Vec<LogEntry>>,
    next_log_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_setting(&self, plugin: &str, key: &str, user_id: i64) -> Result<Option<String>, StorageError> {
        let settings = self.settings.read().await;
        Ok(settings.get(&(plugin.to_string(), key.to_string(), user_id)).cloned())
    }

    async fn set_setting(&self, plugin: &str, key: &str, value: &str, user_id: i64) -> Result<(), StorageError> {
        let mut settings = self.settings.write().await;
        settings.insert((plugin.to_string(), key.to_string(), user_id), value.to_string());
        Ok(())
    }

    async fn record_activity(&self, user: &User, messages: u64, commands: u64) -> Result<(), StorageError> {
        let mut stats = self.stats.write().await;
        let entry = stats.entry(user.id).or_insert_with(|| UserStats::new(user.id));
        entry.username = user.username.clone();
        entry.first_name = user.first_name.clone();
        entry.total_messages += messages;
        entry.commands_used += commands;
        entry.last_seen = Some(Utc::now());
        Ok(())
    }

    async fn user_stats(&self, user_id: i64) -> Result<Option<UserStats>, StorageError> {
        let stats = self.stats.read().await;
        Ok(stats.get(&user_id).cloned())
    }

    async fn approval(&self, user_id: i64) -> Result<Option<ApprovalRecord>, StorageError> {
        let approvals = self.approvals.read().await;
        Ok(approvals.get(&user_id).cloned())
    }

    async fn touch_approval(&self, user: &User) -> Result<(), StorageError> {
        let mut approvals = self.approvals.write().await;
        let record = approvals.entry(user.id).or_insert_with(|| ApprovalRecord::new(user.id));
        record.username = user.username.clone();
        record.first_name = user.first_name.clone();
        Ok(())
    }

    async fn approve(&self, user_id: i64, approved_by: i64) -> Result<(), StorageError> {
        let mut approvals = self.approvals.write().await;
        let record = approvals.entry(user_id).or_insert_with(|| ApprovalRecord::new(user_id));
        record.approved = true;
        record.approved_by = Some(approved_by);
        record.approved_at = Some(Utc::now());
        Ok(())
    }

    async fn disapprove(&self, user_id: i64) -> Result<(), StorageError> {
        let mut approvals = self.approvals.write().await;
        if let Some(record) = approvals.get_mut(&user_id) {
            record.approved = false;
            record.approved_by = None;
            record.approved_at = None;
        }
        Ok(())
    }

    async fn add_warning(&self, user_id: i64) -> Result<u32, StorageError> {
        let mut approvals = self.approvals.write().await;
        let record = approvals.entry(user_id).or_insert_with(|| ApprovalRecord::new(user_id));
        record.warnings += 1;
        record.last_warning = Some(Utc::now());
        Ok(record.warnings)
    }

    async fn add_log(&self, level: LogLevel, message: &str, user_id: Option<i64>, chat_id: Option<i64>) -> Result<(), StorageError> {
        let id = self.next_log_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut logs = self.logs.write().await;
        logs.push(LogEntry {
            id,
            level,
            message: message.to_string(),
            user_id,
            chat_id,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>, StorageError> {
        let logs = self.logs.read().await;
        Ok(logs.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_warnings_survive_profile_refresh() {
        let store = MemoryStore::new();
        let user = User::new(9).with_username("spammer");

        assert_eq!(store.add_warning(9).await.unwrap(), 1);
        store.touch_approval(&user).await.unwrap();
        assert_eq!(store.add_warning(9).await.unwrap(), 2);

        let record = store.approval(9).await.unwrap().unwrap();
        assert_eq!(record.warnings, 2);
        assert_eq!(record.username.as_deref(), Some("spammer"));
        assert!(!record.approved);
    }

    #[tokio::test]
    async fn test_settings_are_scoped() {
        let store = MemoryStore::new();
        store.set_setting("pm_permit", "enabled", "false", 0).await.unwrap();
        store.set_setting("pm_permit", "enabled", "true", 7).await.unwrap();

        assert_eq!(store.get_setting("pm_permit", "enabled", 0).await.unwrap().as_deref(), Some("false"));
        assert_eq!(store.get_setting("pm_permit", "enabled", 7).await.unwrap().as_deref(), Some("true"));
        assert_eq!(store.get_setting("stats", "enabled", 0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_recent_logs_newest_first() {
        let store = MemoryStore::new();
        store.add_log(LogLevel::Info, "first", None, None).await.unwrap();
        store.add_log(LogLevel::Error, "second", Some(1), Some(2)).await.unwrap();

        let logs = store.recent_logs(1).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "second");
        assert_eq!(logs[0].id, 2);
    }
}
