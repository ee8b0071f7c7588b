//! Database migration management
//!
//! Creates and updates the SQLite schema for the primary store: three
//! independently grown collections (showers, settings, metadata) plus the
//! indexes the query paths rely on.

use rusqlite::Connection;

use crate::storage::StorageError;

/// Current database schema version
///
/// Increment this when you add new migrations
const CURRENT_VERSION: i32 = 1;

/// Initialize the database schema
///
/// Creates all required tables and indexes if they don't exist and records
/// the schema version for future migrations. Safe to call repeatedly.
pub fn initialize_database(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let current_version = get_current_version(conn)?;

    if current_version < CURRENT_VERSION {
        run_migrations(conn, current_version)?;
        set_version(conn, CURRENT_VERSION)?;
    }

    Ok(())
}

/// Get the current database schema version
fn get_current_version(conn: &Connection) -> Result<i32, StorageError> {
    let version = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get::<_, i32>(0)
        })
        .unwrap_or(0); // No version record means a fresh database

    Ok(version)
}

/// Set the database schema version
fn set_version(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Run database migrations from the current version to the latest
fn run_migrations(conn: &Connection, from_version: i32) -> Result<(), StorageError> {
    if from_version < 1 {
        migration_v1(conn)?;
    }

    // Future migrations would go here:
    // if from_version < 2 {
    //     migration_v2(conn)?;
    // }

    Ok(())
}

/// Migration to version 1: create the three collections
fn migration_v1(conn: &Connection) -> Result<(), StorageError> {
    // Shower events. Timestamps are fixed-width RFC-3339 text, so the index
    // below gives timestamp order directly.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS showers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            notes TEXT
        )",
        [],
    )?;

    // Settings singleton; at most one row ever exists, enforced by the
    // clear-then-insert save path
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            theme TEXT NOT NULL,
            first_day_of_week INTEGER NOT NULL,
            notifications_enabled INTEGER NOT NULL,
            notification_threshold_days INTEGER NOT NULL,
            github_repo TEXT NOT NULL,
            author TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS metadata (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    create_indexes_v1(conn)?;

    tracing::info!("Applied migration v1: created initial database schema");
    Ok(())
}

/// Create database indexes for version 1
fn create_indexes_v1(conn: &Connection) -> Result<(), StorageError> {
    // Range queries and the descending get-all both scan this index
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_showers_timestamp
         ON showers (timestamp)",
        [],
    )?;

    // One record per metadata key; sets replace in place
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_metadata_key
         ON metadata (key)",
        [],
    )?;

    Ok(())
}
