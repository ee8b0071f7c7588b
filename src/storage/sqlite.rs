//! SQLite implementation of the primary store
//!
//! The preferred backing store: structured, indexed, transactional. Showers
//! are indexed by timestamp so get-all is an indexed reverse scan rather
//! than a post-hoc sort, and range queries are inclusive on both bounds.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{
    format_timestamp, parse_timestamp, FirstDayOfWeek, ProjectInfo, ShowerEvent, ShowerPatch,
    Theme, UserSettings,
};
use crate::storage::{migrations, DataStore, StorageError};

/// SQLite-backed primary store
///
/// Holds the database connection behind a mutex so the store can be shared
/// behind `Arc<dyn DataStore>`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the database file and run any pending migrations
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        migrations::initialize_database(&conn)?;

        tracing::info!("SQLite store initialized at: {:?}", db_path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, useful for tests
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;
        migrations::initialize_database(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Connection("database mutex poisoned".to_string()))
    }

    fn row_to_shower(row: &rusqlite::Row<'_>) -> rusqlite::Result<ShowerEvent> {
        let id: i64 = row.get(0)?;
        let timestamp_text: String = row.get(1)?;
        let timestamp = parse_timestamp(&timestamp_text).map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                1,
                "Invalid timestamp".to_string(),
                rusqlite::types::Type::Text,
            )
        })?;

        Ok(ShowerEvent {
            id: id.to_string(),
            timestamp,
            notes: row.get(2)?,
        })
    }

    fn theme_to_string(theme: Theme) -> &'static str {
        match theme {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    fn string_to_theme(s: &str) -> Theme {
        match s {
            "light" => Theme::Light,
            "dark" => Theme::Dark,
            _ => Theme::System,
        }
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn add_shower(
        &self,
        timestamp: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<ShowerEvent, StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO showers (timestamp, notes) VALUES (?1, ?2)",
            params![format_timestamp(timestamp), notes],
        )?;
        let id = conn.last_insert_rowid();

        tracing::debug!("Added shower {} at {}", id, timestamp);

        Ok(ShowerEvent {
            id: id.to_string(),
            timestamp,
            notes,
        })
    }

    async fn get_all_showers(&self) -> Result<Vec<ShowerEvent>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, notes FROM showers
             ORDER BY timestamp DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_shower)?;

        let mut showers = Vec::new();
        for shower in rows {
            showers.push(shower?);
        }

        Ok(showers)
    }

    async fn get_showers_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ShowerEvent>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, notes FROM showers
             WHERE timestamp BETWEEN ?1 AND ?2
             ORDER BY timestamp DESC",
        )?;
        let rows = stmt.query_map(
            params![format_timestamp(start), format_timestamp(end)],
            Self::row_to_shower,
        )?;

        let mut showers = Vec::new();
        for shower in rows {
            showers.push(shower?);
        }

        Ok(showers)
    }

    async fn get_last_shower(&self) -> Result<Option<ShowerEvent>, StorageError> {
        let conn = self.lock()?;
        let shower = conn
            .query_row(
                "SELECT id, timestamp, notes FROM showers
                 ORDER BY timestamp DESC LIMIT 1",
                [],
                Self::row_to_shower,
            )
            .optional()?;

        Ok(shower)
    }

    async fn update_shower(&self, id: &str, patch: ShowerPatch) -> Result<(), StorageError> {
        // Ids issued by this store are rowids; anything else cannot match
        let Ok(rowid) = id.parse::<i64>() else {
            tracing::debug!("update_shower: non-numeric id {:?} ignored", id);
            return Ok(());
        };

        let conn = self.lock()?;
        let existing = conn
            .query_row(
                "SELECT id, timestamp, notes FROM showers WHERE id = ?1",
                params![rowid],
                Self::row_to_shower,
            )
            .optional()?;

        let Some(mut shower) = existing else {
            tracing::debug!("update_shower: id {} not found, nothing to do", rowid);
            return Ok(());
        };
        patch.apply_to(&mut shower);

        conn.execute(
            "UPDATE showers SET timestamp = ?2, notes = ?3 WHERE id = ?1",
            params![rowid, format_timestamp(shower.timestamp), shower.notes],
        )?;

        Ok(())
    }

    async fn delete_shower(&self, id: &str) -> Result<(), StorageError> {
        let Ok(rowid) = id.parse::<i64>() else {
            return Ok(());
        };

        let conn = self.lock()?;
        conn.execute("DELETE FROM showers WHERE id = ?1", params![rowid])?;
        Ok(())
    }

    async fn get_settings(&self) -> Result<UserSettings, StorageError> {
        let existing = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT theme, first_day_of_week, notifications_enabled,
                        notification_threshold_days, github_repo, author
                 FROM settings LIMIT 1",
                [],
                |row| {
                    let theme_text: String = row.get(0)?;
                    let first_day: i64 = row.get(1)?;
                    let threshold: i64 = row.get(3)?;
                    Ok(UserSettings {
                        theme: Self::string_to_theme(&theme_text),
                        first_day_of_week: FirstDayOfWeek::from_index(first_day),
                        notifications_enabled: row.get(2)?,
                        notification_threshold_days: threshold.max(1) as u32,
                        project_info: ProjectInfo {
                            github_repo: row.get(4)?,
                            author: row.get(5)?,
                        },
                    })
                },
            )
            .optional()?
        };

        match existing {
            Some(settings) => Ok(settings),
            None => {
                // First access: persist defaults so later reads see a record
                let defaults = UserSettings::default();
                self.save_settings(&defaults).await?;
                Ok(defaults)
            }
        }
    }

    async fn save_settings(&self, settings: &UserSettings) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        // Clear-then-insert keeps the singleton invariant: at most one row
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM settings", [])?;
        tx.execute(
            "INSERT INTO settings (
                theme, first_day_of_week, notifications_enabled,
                notification_threshold_days, github_repo, author
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Self::theme_to_string(settings.theme),
                settings.first_day_of_week.as_index(),
                settings.notifications_enabled,
                settings.notification_threshold_days,
                settings.project_info.github_repo,
                settings.project_info.author,
            ],
        )?;
        tx.commit()?;

        tracing::debug!("Saved settings");
        Ok(())
    }

    async fn set_metadata(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO metadata (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, value, format_timestamp(Utc::now())],
        )?;
        Ok(())
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn delete_metadata(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM metadata WHERE key = ?1", params![key])?;
        Ok(())
    }

    async fn all_metadata(
        &self,
    ) -> Result<std::collections::BTreeMap<String, String>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key, value FROM metadata")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get(1)?)))?;

        let mut metadata = std::collections::BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            metadata.insert(key, value);
        }

        Ok(metadata)
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM showers", [])?;
        tx.execute("DELETE FROM settings", [])?;
        tx.execute("DELETE FROM metadata", [])?;
        tx.commit()?;

        tracing::info!("Cleared all persisted data");
        Ok(())
    }
}
