//! Fallback store over the key-value backend
//!
//! Serializes each collection as one JSON slot: showers as an array,
//! settings as a single object, metadata as a key to value/updated-at map.
//! The key-value layer has no indexing, so ordering is computed in memory.
//! Corrupted slot contents are recovered to safe defaults, never thrown.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{MetadataValue, ShowerEvent, ShowerPatch, UserSettings};
use crate::storage::keyvalue::{FileKeyValueBackend, KeyValueBackend};
use crate::storage::{DataStore, StorageError};

const SHOWERS_SLOT: &str = "showers";
const SETTINGS_SLOT: &str = "settings";
const METADATA_SLOT: &str = "metadata";

/// Flat key-value rendition of the three collections
pub struct FallbackStore {
    backend: Arc<dyn KeyValueBackend>,
}

impl FallbackStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    /// File-backed store under the given directory
    pub fn open_dir(dir: impl Into<std::path::PathBuf>) -> Result<Self, StorageError> {
        Ok(Self::new(Arc::new(FileKeyValueBackend::new(dir)?)))
    }

    fn read_showers(&self) -> Vec<ShowerEvent> {
        let Some(raw) = self.backend.get(SHOWERS_SLOT) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(showers) => showers,
            Err(e) => {
                tracing::warn!("Corrupt shower slot, starting from empty: {}", e);
                Vec::new()
            }
        }
    }

    fn write_showers(&self, showers: &[ShowerEvent]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(showers)?;
        self.backend.set(SHOWERS_SLOT, &raw)
    }

    fn read_metadata(&self) -> BTreeMap<String, MetadataValue> {
        let Some(raw) = self.backend.get(METADATA_SLOT) else {
            return BTreeMap::new();
        };
        match serde_json::from_str(&raw) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Corrupt metadata slot, starting from empty: {}", e);
                BTreeMap::new()
            }
        }
    }

    fn write_metadata(&self, metadata: &BTreeMap<String, MetadataValue>) -> Result<(), StorageError> {
        let raw = serde_json::to_string(metadata)?;
        self.backend.set(METADATA_SLOT, &raw)
    }

    fn sort_newest_first(showers: &mut [ShowerEvent]) {
        showers.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
}

#[async_trait]
impl DataStore for FallbackStore {
    async fn add_shower(
        &self,
        timestamp: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<ShowerEvent, StorageError> {
        let event = ShowerEvent {
            id: Uuid::new_v4().to_string(),
            timestamp,
            notes,
        };

        let mut showers = self.read_showers();
        showers.push(event.clone());
        Self::sort_newest_first(&mut showers);
        self.write_showers(&showers)?;

        tracing::debug!("Added shower {} via fallback store", event.id);
        Ok(event)
    }

    async fn get_all_showers(&self) -> Result<Vec<ShowerEvent>, StorageError> {
        let mut showers = self.read_showers();
        Self::sort_newest_first(&mut showers);
        Ok(showers)
    }

    async fn get_showers_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ShowerEvent>, StorageError> {
        let mut showers = self.read_showers();
        showers.retain(|s| s.timestamp >= start && s.timestamp <= end);
        Self::sort_newest_first(&mut showers);
        Ok(showers)
    }

    async fn get_last_shower(&self) -> Result<Option<ShowerEvent>, StorageError> {
        Ok(self.get_all_showers().await?.into_iter().next())
    }

    async fn update_shower(&self, id: &str, patch: ShowerPatch) -> Result<(), StorageError> {
        let mut showers = self.read_showers();
        for shower in showers.iter_mut() {
            if shower.id == id {
                patch.apply_to(shower);
            }
        }
        Self::sort_newest_first(&mut showers);
        self.write_showers(&showers)
    }

    async fn delete_shower(&self, id: &str) -> Result<(), StorageError> {
        let mut showers = self.read_showers();
        showers.retain(|s| s.id != id);
        self.write_showers(&showers)
    }

    async fn get_settings(&self) -> Result<UserSettings, StorageError> {
        let Some(raw) = self.backend.get(SETTINGS_SLOT) else {
            // First access: persist defaults, but never let that stop a read
            let defaults = UserSettings::default();
            if let Err(e) = self.save_settings(&defaults).await {
                tracing::debug!("Could not persist default settings: {}", e);
            }
            return Ok(defaults);
        };

        // serde defaults merge fields absent from older persisted shapes
        match serde_json::from_str(&raw) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!("Corrupt settings slot, using defaults: {}", e);
                Ok(UserSettings::default())
            }
        }
    }

    async fn save_settings(&self, settings: &UserSettings) -> Result<(), StorageError> {
        let raw = serde_json::to_string(settings)?;
        self.backend.set(SETTINGS_SLOT, &raw)
    }

    async fn set_metadata(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut metadata = self.read_metadata();
        metadata.insert(key.to_string(), MetadataValue::new(value));
        self.write_metadata(&metadata)
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_metadata().get(key).map(|m| m.value.clone()))
    }

    async fn delete_metadata(&self, key: &str) -> Result<(), StorageError> {
        let mut metadata = self.read_metadata();
        metadata.remove(key);
        self.write_metadata(&metadata)
    }

    async fn all_metadata(&self) -> Result<BTreeMap<String, String>, StorageError> {
        Ok(self
            .read_metadata()
            .into_iter()
            .map(|(key, m)| (key, m.value))
            .collect())
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        self.backend.remove(SHOWERS_SLOT)?;
        self.backend.remove(SETTINGS_SLOT)?;
        self.backend.remove(METADATA_SLOT)?;
        Ok(())
    }
}
