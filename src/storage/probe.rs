//! Storage capability prober
//!
//! Runs once at client construction to decide which persistence mechanism
//! is usable. Opens and immediately discards a throwaway SQLite database;
//! failing that, runs a write+read+delete cycle against the key-value
//! layer. Leaves no persistent side effects behind.

use rusqlite::Connection;

use crate::storage::keyvalue::{FileKeyValueBackend, KeyValueBackend};
use crate::storage::{StorageConfig, StorageVerdict};

const PROBE_SLOT: &str = "__storage_probe__";
const PROBE_VALUE: &str = "probe";

/// Decide which storage mechanism the current environment supports
///
/// The verdict is cached by the facade for the client's lifetime; re-probing
/// means constructing a new client.
pub fn probe(config: &StorageConfig) -> StorageVerdict {
    if structured_is_usable(config) {
        return StorageVerdict::Structured;
    }

    if keyvalue_is_usable(config) {
        tracing::info!("Structured storage unusable, key-value fallback is available");
        return StorageVerdict::KeyValue;
    }

    tracing::error!("No usable storage mechanism found");
    StorageVerdict::Unavailable
}

/// Open-and-discard a throwaway database next to the configured db path
fn structured_is_usable(config: &StorageConfig) -> bool {
    let probe_path = match config.db_path.parent() {
        Some(parent) => {
            if std::fs::create_dir_all(parent).is_err() {
                return false;
            }
            parent.join(".probe.db")
        }
        None => return false,
    };

    let usable = match Connection::open(&probe_path) {
        Ok(conn) => {
            // A connection alone can succeed lazily; force a real write
            let ok = conn.execute_batch("CREATE TABLE probe (id INTEGER)").is_ok();
            drop(conn);
            ok
        }
        Err(e) => {
            tracing::warn!("Structured storage probe failed: {}", e);
            false
        }
    };

    let _ = std::fs::remove_file(&probe_path);
    usable
}

/// Trivial write+read+delete cycle against the key-value mechanism
fn keyvalue_is_usable(config: &StorageConfig) -> bool {
    let backend = match FileKeyValueBackend::new(&config.fallback_dir) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::warn!("Key-value storage probe failed: {}", e);
            return false;
        }
    };

    let wrote = backend.set(PROBE_SLOT, PROBE_VALUE).is_ok();
    let read_back = backend.get(PROBE_SLOT).as_deref() == Some(PROBE_VALUE);
    let removed = backend.remove(PROBE_SLOT).is_ok();

    wrote && read_back && removed
}
