//! Data access facade
//!
//! The uniform CRUD surface the rest of the app talks to. It picks the
//! backing store once, from the prober's verdict, and hides which store
//! served any given call. With a structured verdict the primary store is
//! wrapped in [`FailoverStore`], so a throwing primary is transparently
//! retried against the fallback exactly once.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ExportData, ShowerEvent, ShowerPatch, UserSettings};
use crate::storage::{
    probe, DataStore, FallbackStore, SqliteStore, StorageConfig, StorageError, StorageVerdict,
};

/// Retry one logical operation via the fallback after a primary failure.
/// Never speculative, never more than one retry; the fallback's own error
/// propagates untouched.
macro_rules! with_failover {
    ($self:ident, $op:literal, $call:ident ( $($arg:expr),* )) => {{
        match $self.primary.$call($(Clone::clone(&$arg)),*).await {
            Ok(value) => Ok(value),
            Err(primary_err) => {
                tracing::warn!(
                    "Primary store failed during {}, retrying via fallback: {}",
                    $op,
                    primary_err
                );
                $self.fallback.$call($($arg),*).await
            }
        }
    }};
}

/// Decorator giving every operation identical failover semantics
///
/// Applied uniformly instead of a per-method try/catch, so the retry path
/// is a single piece of code and independently testable.
pub struct FailoverStore {
    primary: Arc<dyn DataStore>,
    fallback: Arc<dyn DataStore>,
}

impl FailoverStore {
    pub fn new(primary: Arc<dyn DataStore>, fallback: Arc<dyn DataStore>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl DataStore for FailoverStore {
    async fn add_shower(
        &self,
        timestamp: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<ShowerEvent, StorageError> {
        with_failover!(self, "add_shower", add_shower(timestamp, notes))
    }

    async fn get_all_showers(&self) -> Result<Vec<ShowerEvent>, StorageError> {
        with_failover!(self, "get_all_showers", get_all_showers())
    }

    async fn get_showers_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ShowerEvent>, StorageError> {
        with_failover!(self, "get_showers_in_range", get_showers_in_range(start, end))
    }

    async fn get_last_shower(&self) -> Result<Option<ShowerEvent>, StorageError> {
        with_failover!(self, "get_last_shower", get_last_shower())
    }

    async fn update_shower(&self, id: &str, patch: ShowerPatch) -> Result<(), StorageError> {
        with_failover!(self, "update_shower", update_shower(id, patch))
    }

    async fn delete_shower(&self, id: &str) -> Result<(), StorageError> {
        with_failover!(self, "delete_shower", delete_shower(id))
    }

    async fn get_settings(&self) -> Result<UserSettings, StorageError> {
        with_failover!(self, "get_settings", get_settings())
    }

    async fn save_settings(&self, settings: &UserSettings) -> Result<(), StorageError> {
        with_failover!(self, "save_settings", save_settings(settings))
    }

    async fn set_metadata(&self, key: &str, value: &str) -> Result<(), StorageError> {
        with_failover!(self, "set_metadata", set_metadata(key, value))
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<String>, StorageError> {
        with_failover!(self, "get_metadata", get_metadata(key))
    }

    async fn delete_metadata(&self, key: &str) -> Result<(), StorageError> {
        with_failover!(self, "delete_metadata", delete_metadata(key))
    }

    async fn all_metadata(
        &self,
    ) -> Result<std::collections::BTreeMap<String, String>, StorageError> {
        with_failover!(self, "all_metadata", all_metadata())
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        with_failover!(self, "clear_all", clear_all())
    }
}

/// The store the rest of the app holds on to
///
/// Explicitly constructed and passed where needed (no module-level global),
/// so tests get a fresh instance each. The probe verdict is fixed for this
/// facade's lifetime.
pub struct StorageFacade {
    verdict: StorageVerdict,
    store: Option<Arc<dyn DataStore>>,
}

impl StorageFacade {
    /// Probe the environment and initialize the chosen store
    ///
    /// A structured verdict whose database then refuses to open degrades to
    /// the key-value store, or to unavailable, rather than failing
    /// construction; reads stay usable either way.
    pub fn connect(config: &StorageConfig) -> Self {
        let verdict = probe(config);
        Self::with_verdict(config, verdict)
    }

    fn with_verdict(config: &StorageConfig, verdict: StorageVerdict) -> Self {
        match verdict {
            StorageVerdict::Structured => match SqliteStore::new(config.db_path.clone()) {
                Ok(primary) => {
                    let primary: Arc<dyn DataStore> = Arc::new(primary);
                    match FallbackStore::open_dir(&config.fallback_dir) {
                        Ok(fallback) => Self {
                            verdict,
                            store: Some(Arc::new(FailoverStore::new(
                                primary,
                                Arc::new(fallback),
                            ))),
                        },
                        Err(e) => {
                            // No failover target; run on the primary alone
                            tracing::warn!("Fallback store unavailable: {}", e);
                            Self {
                                verdict,
                                store: Some(primary),
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Primary store failed to open, degrading: {}", e);
                    Self::with_verdict(config, StorageVerdict::KeyValue)
                }
            },
            StorageVerdict::KeyValue => match FallbackStore::open_dir(&config.fallback_dir) {
                Ok(fallback) => Self {
                    verdict: StorageVerdict::KeyValue,
                    store: Some(Arc::new(fallback)),
                },
                Err(e) => {
                    tracing::error!("Key-value store failed to open: {}", e);
                    Self {
                        verdict: StorageVerdict::Unavailable,
                        store: None,
                    }
                }
            },
            StorageVerdict::Unavailable => Self {
                verdict,
                store: None,
            },
        }
    }

    /// Facade over an already constructed store, for tests and embedding
    pub fn with_store(verdict: StorageVerdict, store: Arc<dyn DataStore>) -> Self {
        Self {
            verdict,
            store: Some(store),
        }
    }

    /// Facade with nothing usable behind it
    pub fn unavailable() -> Self {
        Self {
            verdict: StorageVerdict::Unavailable,
            store: None,
        }
    }

    pub fn verdict(&self) -> StorageVerdict {
        self.verdict
    }

    pub fn is_storage_available(&self) -> bool {
        self.store.is_some()
    }

    fn store(&self) -> Result<&Arc<dyn DataStore>, StorageError> {
        self.store.as_ref().ok_or(StorageError::Unavailable)
    }

    /// Full-state export for backup and debugging
    pub async fn export_data(&self) -> Result<ExportData, StorageError> {
        Ok(ExportData {
            showers: self.get_all_showers().await?,
            settings: self.get_settings().await?,
            metadata: self.all_metadata().await?,
        })
    }
}

#[async_trait]
impl DataStore for StorageFacade {
    async fn add_shower(
        &self,
        timestamp: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<ShowerEvent, StorageError> {
        self.store()?.add_shower(timestamp, notes).await
    }

    async fn get_all_showers(&self) -> Result<Vec<ShowerEvent>, StorageError> {
        match &self.store {
            Some(store) => store.get_all_showers().await,
            None => Ok(Vec::new()),
        }
    }

    async fn get_showers_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ShowerEvent>, StorageError> {
        match &self.store {
            Some(store) => store.get_showers_in_range(start, end).await,
            None => Ok(Vec::new()),
        }
    }

    async fn get_last_shower(&self) -> Result<Option<ShowerEvent>, StorageError> {
        match &self.store {
            Some(store) => store.get_last_shower().await,
            None => Ok(None),
        }
    }

    async fn update_shower(&self, id: &str, patch: ShowerPatch) -> Result<(), StorageError> {
        self.store()?.update_shower(id, patch).await
    }

    async fn delete_shower(&self, id: &str) -> Result<(), StorageError> {
        self.store()?.delete_shower(id).await
    }

    async fn get_settings(&self) -> Result<UserSettings, StorageError> {
        match &self.store {
            Some(store) => store.get_settings().await,
            None => Ok(UserSettings::default()),
        }
    }

    async fn save_settings(&self, settings: &UserSettings) -> Result<(), StorageError> {
        self.store()?.save_settings(settings).await
    }

    async fn set_metadata(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.store()?.set_metadata(key, value).await
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<String>, StorageError> {
        match &self.store {
            Some(store) => store.get_metadata(key).await,
            None => Ok(None),
        }
    }

    async fn delete_metadata(&self, key: &str) -> Result<(), StorageError> {
        self.store()?.delete_metadata(key).await
    }

    async fn all_metadata(
        &self,
    ) -> Result<std::collections::BTreeMap<String, String>, StorageError> {
        match &self.store {
            Some(store) => store.all_metadata().await,
            None => Ok(std::collections::BTreeMap::new()),
        }
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        self.store()?.clear_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SettingsUpdate;
    use crate::storage::keyvalue::MemoryKeyValueBackend;
    use chrono::TimeZone;

    /// A primary that throws on every operation
    struct BrokenStore;

    #[async_trait]
    impl DataStore for BrokenStore {
        async fn add_shower(
            &self,
            _timestamp: DateTime<Utc>,
            _notes: Option<String>,
        ) -> Result<ShowerEvent, StorageError> {
            Err(StorageError::Connection("broken".to_string()))
        }
        async fn get_all_showers(&self) -> Result<Vec<ShowerEvent>, StorageError> {
            Err(StorageError::Connection("broken".to_string()))
        }
        async fn get_showers_in_range(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<ShowerEvent>, StorageError> {
            Err(StorageError::Connection("broken".to_string()))
        }
        async fn get_last_shower(&self) -> Result<Option<ShowerEvent>, StorageError> {
            Err(StorageError::Connection("broken".to_string()))
        }
        async fn update_shower(&self, _id: &str, _patch: ShowerPatch) -> Result<(), StorageError> {
            Err(StorageError::Connection("broken".to_string()))
        }
        async fn delete_shower(&self, _id: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("broken".to_string()))
        }
        async fn get_settings(&self) -> Result<UserSettings, StorageError> {
            Err(StorageError::Connection("broken".to_string()))
        }
        async fn save_settings(&self, _settings: &UserSettings) -> Result<(), StorageError> {
            Err(StorageError::Connection("broken".to_string()))
        }
        async fn set_metadata(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("broken".to_string()))
        }
        async fn get_metadata(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Connection("broken".to_string()))
        }
        async fn delete_metadata(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("broken".to_string()))
        }
        async fn all_metadata(
            &self,
        ) -> Result<std::collections::BTreeMap<String, String>, StorageError> {
            Err(StorageError::Connection("broken".to_string()))
        }
        async fn clear_all(&self) -> Result<(), StorageError> {
            Err(StorageError::Connection("broken".to_string()))
        }
    }

    fn failover_with_broken_primary() -> FailoverStore {
        let fallback = FallbackStore::new(Arc::new(MemoryKeyValueBackend::new()));
        FailoverStore::new(Arc::new(BrokenStore), Arc::new(fallback))
    }

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn broken_primary_is_invisible_to_callers() {
        let store = failover_with_broken_primary();

        let event = store
            .add_shower(at(15), Some("Morning".to_string()))
            .await
            .unwrap();
        store.add_shower(at(16), None).await.unwrap();

        let all = store.get_all_showers().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].id, event.id);

        let last = store.get_last_shower().await.unwrap().unwrap();
        assert_eq!(last.timestamp, at(16));

        store
            .update_shower(&event.id, ShowerPatch::notes(Some("Evening".to_string())))
            .await
            .unwrap();
        store.delete_shower(&event.id).await.unwrap();
        assert_eq!(store.get_all_showers().await.unwrap().len(), 1);

        let settings = store
            .update_setting(SettingsUpdate::NotificationsEnabled(true))
            .await
            .unwrap();
        assert!(settings.notifications_enabled);

        store.set_metadata("k", "v").await.unwrap();
        assert_eq!(store.get_metadata("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn fallback_failure_propagates_without_second_retry() {
        let backend = Arc::new(MemoryKeyValueBackend::new());
        backend.set_read_only(true);
        let store = FailoverStore::new(
            Arc::new(BrokenStore),
            Arc::new(FallbackStore::new(backend)),
        );

        let err = store.add_shower(at(15), None).await.unwrap_err();
        assert!(matches!(err, StorageError::WriteFailed(_)));
    }

    #[tokio::test]
    async fn unavailable_facade_degrades_reads_and_fails_writes() {
        let facade = StorageFacade::unavailable();

        assert!(facade.get_all_showers().await.unwrap().is_empty());
        assert_eq!(facade.get_last_shower().await.unwrap(), None);
        assert_eq!(
            facade.get_settings().await.unwrap(),
            UserSettings::default()
        );
        assert_eq!(facade.get_metadata("k").await.unwrap(), None);
        assert_eq!(facade.get_last_notification_check().await.unwrap(), None);

        assert!(matches!(
            facade.add_shower(at(15), None).await.unwrap_err(),
            StorageError::Unavailable
        ));
        assert!(matches!(
            facade
                .save_settings(&UserSettings::default())
                .await
                .unwrap_err(),
            StorageError::Unavailable
        ));
        assert!(matches!(
            facade.set_metadata("k", "v").await.unwrap_err(),
            StorageError::Unavailable
        ));
    }

    #[tokio::test]
    async fn connect_degrades_when_db_path_is_blocked() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let config = StorageConfig {
            db_path: blocker.join("showers.db"),
            fallback_dir: dir.path().join("fallback"),
        };

        let facade = StorageFacade::connect(&config);
        assert_eq!(facade.verdict(), StorageVerdict::KeyValue);

        // And it is fully usable
        facade.add_shower(at(15), None).await.unwrap();
        assert_eq!(facade.get_all_showers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn export_reflects_current_contents() {
        let dir = tempfile::TempDir::new().unwrap();
        let facade = StorageFacade::connect(&StorageConfig::in_dir(dir.path()));
        assert_eq!(facade.verdict(), StorageVerdict::Structured);

        facade.add_shower(at(15), None).await.unwrap();
        facade.set_metadata("k", "v").await.unwrap();

        let export = facade.export_data().await.unwrap();
        assert_eq!(export.showers.len(), 1);
        assert_eq!(export.settings, UserSettings::default());
        assert_eq!(export.metadata.get("k").map(String::as_str), Some("v"));
    }
}
