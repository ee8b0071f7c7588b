//! Storage layer for persisting tracker data
//!
//! Two backing stores exist: a structured SQLite database (primary) and a
//! flat key-value fallback. The [`DataStore`] trait is the common contract
//! both implement; the facade decides which one serves a given call and the
//! failover decorator retries a failing primary against the fallback.

pub mod facade;
pub mod fallback;
pub mod keyvalue;
pub mod migrations;
pub mod probe;
pub mod sqlite;

// Re-export the main storage types
pub use facade::StorageFacade;
pub use fallback::FallbackStore;
pub use keyvalue::{FileKeyValueBackend, KeyValueBackend, MemoryKeyValueBackend};
pub use probe::probe;
pub use sqlite::SqliteStore;

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{
    format_timestamp, parse_timestamp, SettingsUpdate, ShowerEvent, ShowerPatch, UserSettings,
    LAST_NOTIFICATION_CHECK_KEY,
};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// No usable persistence mechanism was found. Reads degrade to empty or
    /// default values; writes fail with this error.
    #[error("no storage available")]
    Unavailable,

    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A key-value write failed (quota, permissions, disk). Surfaced to the
    /// caller so the UI can tell the user; never retried automatically.
    #[error("Failed to write to key-value storage: {0}")]
    WriteFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which persistence mechanism the prober found usable
///
/// Decided once per client and cached for its lifetime; a fresh probe means
/// constructing a fresh client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageVerdict {
    /// The structured, indexed SQLite database is usable
    Structured,
    /// Only the flat key-value mechanism is usable
    KeyValue,
    /// Nothing is usable
    Unavailable,
}

/// Where the two stores keep their data
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path of the primary SQLite database file
    pub db_path: PathBuf,
    /// Directory holding the fallback store's key-value slots
    pub fallback_dir: PathBuf,
}

impl StorageConfig {
    /// Place both stores under one data directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            db_path: dir.join("showers.db"),
            fallback_dir: dir.join("fallback"),
        }
    }

    /// Resolve a per-user data directory with a preference-ordered fallback
    /// strategy, verifying each candidate is actually writable.
    pub fn default_locations() -> Result<Self, StorageError> {
        let candidates = [
            dirs::data_dir().map(|mut p| {
                p.push("shower-tracker");
                p
            }),
            dirs::home_dir().map(|mut p| {
                p.push(".shower-tracker");
                p
            }),
            std::env::current_dir().ok().map(|mut p| {
                p.push(".shower-tracker");
                p
            }),
        ];

        for candidate in candidates.iter().flatten() {
            if std::fs::create_dir_all(candidate).is_err() {
                continue;
            }
            let test_file = candidate.join(".test_write");
            if std::fs::write(&test_file, "test").is_ok() {
                let _ = std::fs::remove_file(&test_file);
                return Ok(Self::in_dir(candidate));
            }
        }

        // Last resort: a temporary directory
        let mut temp = std::env::temp_dir();
        temp.push("shower-tracker");
        std::fs::create_dir_all(&temp)?;
        tracing::warn!("Using temporary directory for data: {}", temp.display());
        Ok(Self::in_dir(temp))
    }
}

/// The CRUD contract both stores implement
///
/// Return shapes are identical across implementations so the facade can
/// reroute a call without the caller noticing.
#[async_trait]
pub trait DataStore: Send + Sync {
    // Shower events

    /// Persist a new shower and return it with its assigned id
    async fn add_shower(
        &self,
        timestamp: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<ShowerEvent, StorageError>;

    /// All showers, sorted descending by timestamp (most recent first)
    async fn get_all_showers(&self) -> Result<Vec<ShowerEvent>, StorageError>;

    /// Showers with `start <= timestamp <= end`, inclusive on both bounds
    async fn get_showers_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ShowerEvent>, StorageError>;

    /// The most recent shower, if any
    async fn get_last_shower(&self) -> Result<Option<ShowerEvent>, StorageError>;

    /// Apply a partial update to an existing shower. Unknown ids are a
    /// silent no-op, matching delete semantics.
    async fn update_shower(&self, id: &str, patch: ShowerPatch) -> Result<(), StorageError>;

    /// Permanently remove a shower; unknown ids are a silent no-op
    async fn delete_shower(&self, id: &str) -> Result<(), StorageError>;

    // Settings singleton

    /// The persisted settings, synthesizing and persisting defaults the
    /// first time none exist
    async fn get_settings(&self) -> Result<UserSettings, StorageError>;

    /// Fully replace the settings singleton
    async fn save_settings(&self, settings: &UserSettings) -> Result<(), StorageError>;

    /// Read-merge-write a single settings field, returning the result
    async fn update_setting(&self, update: SettingsUpdate) -> Result<UserSettings, StorageError> {
        let merged = self.get_settings().await?.with_update(update);
        self.save_settings(&merged).await?;
        Ok(merged)
    }

    // Metadata

    /// Set a metadata key, replacing any existing value and bumping its
    /// updated-at stamp
    async fn set_metadata(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn get_metadata(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn delete_metadata(&self, key: &str) -> Result<(), StorageError>;

    /// Every metadata key with its current value, for export
    async fn all_metadata(&self) -> Result<BTreeMap<String, String>, StorageError>;

    /// Remove every record of every kind
    async fn clear_all(&self) -> Result<(), StorageError>;

    // Well-known metadata conveniences

    /// When notifications were last evaluated, if ever recorded
    async fn get_last_notification_check(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let value = self.get_metadata(LAST_NOTIFICATION_CHECK_KEY).await?;
        Ok(value.and_then(|text| parse_timestamp(&text).ok()))
    }

    async fn set_last_notification_check(
        &self,
        checked_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.set_metadata(LAST_NOTIFICATION_CHECK_KEY, &format_timestamp(checked_at))
            .await
    }
}
