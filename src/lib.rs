/// Public library interface for the shower tracker core
///
/// This crate is the platform-independent heart of the app: storage with
/// automatic fallback, the application state store, PWA lifecycle and
/// install-prompt management, and the reminder scheduler. The hosting
/// shell supplies the platform ports (worker runtime, cache buckets,
/// notification API) and renders from [`state::AppState`].

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

pub mod domain;
pub mod notifications;
pub mod pwa;
pub mod state;
pub mod storage;

pub use domain::{
    ExportData, FirstDayOfWeek, SettingsUpdate, ShowerEvent, ShowerPatch, Theme, UserSettings,
};
pub use notifications::{NotificationPort, NotificationScheduler, Permission};
pub use pwa::{InstallPromptManager, PwaLifecycle};
pub use state::{AppState, StateStore};
pub use storage::{DataStore, StorageConfig, StorageError, StorageFacade, StorageVerdict};

/// Errors surfaced by the top-level client
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("PWA error: {0}")]
    Pwa(#[from] pwa::PwaError),

    #[error("Notification error: {0}")]
    Notification(#[from] notifications::NotificationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The assembled application core
///
/// Probes storage, boots the state store from whatever store the probe
/// selected, and hands out the shared state handle the scheduler and the
/// UI both work through.
pub struct ShowerTracker {
    facade: Arc<StorageFacade>,
    store: Arc<Mutex<StateStore>>,
}

impl ShowerTracker {
    /// Probe the configured locations, open the best available store, and
    /// load the initial state
    ///
    /// Never fails: an unusable disk degrades to the unavailable facade
    /// and the app starts with in-memory defaults.
    pub async fn connect(config: &StorageConfig) -> Self {
        tracing::info!(
            "Starting shower tracker with database at {:?}",
            config.db_path
        );

        let facade = Arc::new(StorageFacade::connect(config));
        let store = StateStore::boot(facade.clone()).await;

        Self {
            facade,
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Connect using the platform's standard data directories
    pub async fn connect_default() -> Result<Self, AppError> {
        let config = StorageConfig::default_locations()?;
        Ok(Self::connect(&config).await)
    }

    pub fn facade(&self) -> &Arc<StorageFacade> {
        &self.facade
    }

    /// The shared state store; the UI and the scheduler both lock this
    pub fn store(&self) -> Arc<Mutex<StateStore>> {
        self.store.clone()
    }

    /// Build the reminder scheduler over this app's state
    pub fn scheduler(&self, port: Arc<dyn NotificationPort>) -> NotificationScheduler {
        NotificationScheduler::new(self.store.clone(), port)
    }

    /// Snapshot of the current application state
    pub async fn state(&self) -> AppState {
        self.store.lock().await.state().clone()
    }
}
