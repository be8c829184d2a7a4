//! SQLite storage implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::application::errors::StorageError;
use crate::domain::entities::{ApprovalRecord, LogEntry, LogLevel, User, UserStats};
use crate::domain::traits::Store;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        init_tables(&conn)?;
        tracing::info!("Database tables created/verified");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

fn init_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS pm_permits (
            user_id INTEGER PRIMARY KEY,
            username TEXT,
            first_name TEXT,
            approved INTEGER NOT NULL DEFAULT 0,
            approved_by INTEGER,
            approved_at TEXT,
            warnings INTEGER NOT NULL DEFAULT 0,
            last_warning TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_stats (
            user_id INTEGER PRIMARY KEY,
            username TEXT,
            first_name TEXT,
            total_messages INTEGER NOT NULL DEFAULT 0,
            commands_used INTEGER NOT NULL DEFAULT 0,
            last_seen TEXT,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS plugin_settings (
            plugin_name TEXT NOT NULL,
            setting_key TEXT NOT NULL,
            setting_value TEXT NOT NULL,
            user_id INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (plugin_name, setting_key, user_id)
        );

        CREATE TABLE IF NOT EXISTS bot_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            level TEXT NOT NULL,
            message TEXT NOT NULL,
            user_id INTEGER,
            chat_id INTEGER,
            timestamp TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_bot_logs_timestamp ON bot_logs(timestamp);",
    )
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn parse_time(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn approval_from_row(row: &Row<'_>) -> rusqlite::Result<ApprovalRecord> {
    Ok(ApprovalRecord {
        user_id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        approved: row.get(3)?,
        approved_by: row.get(4)?,
        approved_at: parse_time(row.get(5)?),
        warnings: row.get(6)?,
        last_warning: parse_time(row.get(7)?),
    })
}

#[async_trait]
impl Store for Database {
    async fn get_setting(&self, plugin: &str, key: &str, user_id: i64) -> Result<Option<String>, StorageError> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT setting_value FROM plugin_settings
                 WHERE plugin_name = ?1 AND setting_key = ?2 AND user_id = ?3",
                params![plugin, key, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn set_setting(&self, plugin: &str, key: &str, value: &str, user_id: i64) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO plugin_settings (plugin_name, setting_key, setting_value, user_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![plugin, key, value, user_id, now()],
        )?;
        Ok(())
    }

    async fn record_activity(&self, user: &User, messages: u64, commands: u64) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let ts = now();
        conn.execute(
            "INSERT INTO user_stats (user_id, username, first_name, total_messages, commands_used, last_seen, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(user_id) DO UPDATE SET
                username = excluded.username,
                first_name = excluded.first_name,
                total_messages = total_messages + excluded.total_messages,
                commands_used = commands_used + excluded.commands_used,
                last_seen = excluded.last_seen,
                updated_at = excluded.updated_at",
            params![
                user.id,
                user.username,
                user.first_name,
                messages as i64,
                commands as i64,
                ts
            ],
        )?;
        Ok(())
    }

    async fn user_stats(&self, user_id: i64) -> Result<Option<UserStats>, StorageError> {
        let conn = self.conn()?;
        let stats = conn
            .query_row(
                "SELECT user_id, username, first_name, total_messages, commands_used, last_seen
                 FROM user_stats WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(UserStats {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        first_name: row.get(2)?,
                        total_messages: row.get::<_, i64>(3)? as u64,
                        commands_used: row.get::<_, i64>(4)? as u64,
                        last_seen: parse_time(row.get(5)?),
                    })
                },
            )
            .optional()?;
        Ok(stats)
    }

    async fn approval(&self, user_id: i64) -> Result<Option<ApprovalRecord>, StorageError> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT user_id, username, first_name, approved, approved_by, approved_at, warnings, last_warning
                 FROM pm_permits WHERE user_id = ?1",
                [user_id],
                approval_from_row,
            )
            .optional()?;
        Ok(record)
    }

    async fn touch_approval(&self, user: &User) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO pm_permits (user_id, username, first_name, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                username = excluded.username,
                first_name = excluded.first_name",
            params![user.id, user.username, user.first_name, now()],
        )?;
        Ok(())
    }

    async fn approve(&self, user_id: i64, approved_by: i64) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let ts = now();
        conn.execute(
            "INSERT INTO pm_permits (user_id, approved, approved_by, approved_at, created_at)
             VALUES (?1, 1, ?2, ?3, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                approved = 1,
                approved_by = excluded.approved_by,
                approved_at = excluded.approved_at",
            params![user_id, approved_by, ts],
        )?;
        Ok(())
    }

    async fn disapprove(&self, user_id: i64) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE pm_permits SET approved = 0, approved_by = NULL, approved_at = NULL
             WHERE user_id = ?1",
            [user_id],
        )?;
        Ok(())
    }

    async fn add_warning(&self, user_id: i64) -> Result<u32, StorageError> {
        let conn = self.conn()?;
        let ts = now();
        conn.execute(
            "INSERT INTO pm_permits (user_id, warnings, last_warning, created_at)
             VALUES (?1, 1, ?2, ?2)
             ON CONFLICT(user_id) DO UPDATE SET
                warnings = warnings + 1,
                last_warning = excluded.last_warning",
            params![user_id, ts],
        )?;
        let warnings = conn.query_row(
            "SELECT warnings FROM pm_permits WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(warnings)
    }

    async fn add_log(&self, level: LogLevel, message: &str, user_id: Option<i64>, chat_id: Option<i64>) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO bot_logs (level, message, user_id, chat_id, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![level.as_str(), message, user_id, chat_id, now()],
        )?;
        Ok(())
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, level, message, user_id, chat_id, timestamp
             FROM bot_logs ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let level: String = row.get(1)?;
            Ok(LogEntry {
                id: row.get(0)?,
                level: level.parse().unwrap_or(LogLevel::Info),
                message: row.get(2)?,
                user_id: row.get(3)?,
                chat_id: row.get(4)?,
                timestamp: parse_time(row.get(5)?).unwrap_or_else(Utc::now),
            })
        })?;

        let mut logs = Vec::new();
        for entry in rows {
            logs.push(entry?);
        }
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_approval_flow() {
        let db = Database::open_in_memory().unwrap();
        let user = User::new(42).with_username("stranger").with_name("Str", None::<String>);

        assert!(db.approval(42).await.unwrap().is_none());
        assert_eq!(db.add_warning(42).await.unwrap(), 1);
        db.touch_approval(&user).await.unwrap();
        assert_eq!(db.add_warning(42).await.unwrap(), 2);

        db.approve(42, 1).await.unwrap();
        let record = db.approval(42).await.unwrap().unwrap();
        assert!(record.approved);
        assert_eq!(record.approved_by, Some(1));
        assert!(record.approved_at.is_some());
        assert_eq!(record.warnings, 2);
        assert_eq!(record.username.as_deref(), Some("stranger"));

        db.disapprove(42).await.unwrap();
        let record = db.approval(42).await.unwrap().unwrap();
        assert!(!record.approved);
        assert_eq!(record.approved_by, None);
    }

    #[tokio::test]
    async fn test_open_creates_parent_directory() {
        let dir = std::env::temp_dir().join(format!("userbot-{}", uuid::Uuid::new_v4()));
        let path = dir.join("data").join("userbot.db");

        let db = Database::open(&path).unwrap();
        db.set_setting("alive", "template", "hi", 0).await.unwrap();
        assert!(path.exists());

        drop(db);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_approve_creates_missing_record() {
        let db = Database::open_in_memory().unwrap();
        db.approve(5, 1).await.unwrap();
        assert!(db.approval(5).await.unwrap().unwrap().approved);
    }

    #[tokio::test]
    async fn test_activity_counters_accumulate() {
        let db = Database::open_in_memory().unwrap();
        let user = User::new(3).with_username("me");

        db.record_activity(&user, 1, 0).await.unwrap();
        db.record_activity(&user, 2, 1).await.unwrap();

        let stats = db.user_stats(3).await.unwrap().unwrap();
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.commands_used, 1);
        assert!(stats.last_seen.is_some());
        assert!(db.user_stats(4).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_settings_overwrite_per_scope() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting("pm_permit", "enabled", "true", 0).await.unwrap();
        db.set_setting("pm_permit", "enabled", "false", 0).await.unwrap();
        db.set_setting("pm_permit", "enabled", "true", 9).await.unwrap();

        assert_eq!(db.get_setting("pm_permit", "enabled", 0).await.unwrap().as_deref(), Some("false"));
        assert_eq!(db.get_setting("pm_permit", "enabled", 9).await.unwrap().as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn test_logs() {
        let db = Database::open_in_memory().unwrap();
        db.add_log(LogLevel::Info, "approved", Some(1), None).await.unwrap();
        db.add_log(LogLevel::Error, "blocked failed", None, Some(-100)).await.unwrap();

        let logs = db.recent_logs(10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].level, LogLevel::Error);
        assert_eq!(logs[0].chat_id, Some(-100));
        assert_eq!(logs[1].message, "approved");
    }
}
