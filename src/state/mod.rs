//! Application state store
//!
//! An in-memory, single-writer cache of showers, settings, and the last
//! notification check, populated from the storage facade at boot. The
//! reducer is pure and synchronous; every mutating command writes through
//! the facade first and dispatches into the reducer only after the write
//! succeeded, so memory never diverges from storage on a failed write.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{SettingsUpdate, ShowerEvent, ShowerPatch, UserSettings};
use crate::storage::{DataStore, StorageError, StorageFacade};

/// Message shown when the boot load fails
const LOAD_ERROR_MESSAGE: &str = "Failed to load saved data. Please restart the app.";

/// The in-memory application state the UI renders from
///
/// `showers` is always sorted descending by timestamp. This is a read
/// cache; the stores own the data.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub showers: Vec<ShowerEvent>,
    pub settings: UserSettings,
    pub last_notification_check: Option<DateTime<Utc>>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            showers: Vec::new(),
            settings: UserSettings::default(),
            last_notification_check: None,
            is_loading: true,
            error: None,
        }
    }
}

/// The closed set of state transitions
#[derive(Debug, Clone)]
pub enum AppAction {
    SetLoading(bool),
    SetShowers(Vec<ShowerEvent>),
    AddShower(ShowerEvent),
    UpdateShower { id: String, patch: ShowerPatch },
    DeleteShower(String),
    SetSettings(UserSettings),
    UpdateSetting(SettingsUpdate),
    SetLastNotificationCheck(Option<DateTime<Utc>>),
    SetError(Option<String>),
}

/// Pure, synchronous reducer
pub fn reduce(state: &mut AppState, action: AppAction) {
    match action {
        AppAction::SetLoading(loading) => state.is_loading = loading,

        AppAction::SetShowers(showers) => state.showers = showers,

        AppAction::AddShower(shower) => {
            // The common case is a brand-new event, which prepends; only a
            // backdated event forces a full re-sort
            let newest_first = state
                .showers
                .first()
                .map(|head| shower.timestamp >= head.timestamp)
                .unwrap_or(true);
            state.showers.insert(0, shower);
            if !newest_first {
                state
                    .showers
                    .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            }
        }

        AppAction::UpdateShower { id, patch } => {
            for shower in state.showers.iter_mut() {
                if shower.id == id {
                    patch.apply_to(shower);
                }
            }
            // A moved timestamp can change the ordering
            state
                .showers
                .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        }

        AppAction::DeleteShower(id) => state.showers.retain(|s| s.id != id),

        AppAction::SetSettings(settings) => state.settings = settings,

        AppAction::UpdateSetting(update) => update.apply_to(&mut state.settings),

        AppAction::SetLastNotificationCheck(checked_at) => {
            state.last_notification_check = checked_at;
        }

        AppAction::SetError(error) => state.error = error,
    }
}

/// Single writer of [`AppState`]
///
/// Takes the facade by injection so each test gets an isolated instance.
/// Commands run write-then-dispatch; because every command borrows the
/// store mutably, whole commands serialize and state updates apply in
/// completion order, which is the accepted best-effort behavior for a
/// single-user local app.
pub struct StateStore {
    facade: Arc<StorageFacade>,
    state: AppState,
}

impl StateStore {
    pub fn new(facade: Arc<StorageFacade>) -> Self {
        Self {
            facade,
            state: AppState::default(),
        }
    }

    /// Construct and run the boot load: probe result is already baked into
    /// the facade, so this loads showers, settings, and the last check in
    /// parallel, then clears the loading flag whatever happened.
    pub async fn boot(facade: Arc<StorageFacade>) -> Self {
        let mut store = Self::new(facade);
        store.load_initial().await;
        store
    }

    async fn load_initial(&mut self) {
        self.apply(AppAction::SetLoading(true));
        self.apply(AppAction::SetError(None));

        let loaded = tokio::try_join!(
            self.facade.get_all_showers(),
            self.facade.get_settings(),
            self.facade.get_last_notification_check(),
        );

        match loaded {
            Ok((showers, settings, last_check)) => {
                self.apply(AppAction::SetShowers(showers));
                self.apply(AppAction::SetSettings(settings));
                self.apply(AppAction::SetLastNotificationCheck(last_check));
            }
            Err(e) => {
                tracing::error!("Failed to load initial state: {}", e);
                self.apply(AppAction::SetError(Some(LOAD_ERROR_MESSAGE.to_string())));
            }
        }

        self.apply(AppAction::SetLoading(false));
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn facade(&self) -> &Arc<StorageFacade> {
        &self.facade
    }

    fn apply(&mut self, action: AppAction) {
        reduce(&mut self.state, action);
    }

    /// Record a write failure for the UI and hand the error back
    fn fail<T>(&mut self, err: StorageError) -> Result<T, StorageError> {
        self.apply(AppAction::SetError(Some(err.to_string())));
        Err(err)
    }

    pub fn clear_error(&mut self) {
        self.apply(AppAction::SetError(None));
    }

    /// Log a shower; `timestamp` defaults to now
    pub async fn add_shower(
        &mut self,
        timestamp: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> Result<ShowerEvent, StorageError> {
        let timestamp = timestamp.unwrap_or_else(Utc::now);
        match self.facade.add_shower(timestamp, notes).await {
            Ok(event) => {
                self.apply(AppAction::AddShower(event.clone()));
                Ok(event)
            }
            Err(e) => self.fail(e),
        }
    }

    pub async fn update_shower(
        &mut self,
        id: &str,
        patch: ShowerPatch,
    ) -> Result<(), StorageError> {
        match self.facade.update_shower(id, patch.clone()).await {
            Ok(()) => {
                self.apply(AppAction::UpdateShower {
                    id: id.to_string(),
                    patch,
                });
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    pub async fn delete_shower(&mut self, id: &str) -> Result<(), StorageError> {
        match self.facade.delete_shower(id).await {
            Ok(()) => {
                self.apply(AppAction::DeleteShower(id.to_string()));
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    pub async fn save_settings(&mut self, settings: UserSettings) -> Result<(), StorageError> {
        match self.facade.save_settings(&settings).await {
            Ok(()) => {
                self.apply(AppAction::SetSettings(settings));
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    pub async fn update_setting(
        &mut self,
        update: SettingsUpdate,
    ) -> Result<UserSettings, StorageError> {
        match self.facade.update_setting(update.clone()).await {
            Ok(merged) => {
                self.apply(AppAction::UpdateSetting(update));
                Ok(merged)
            }
            Err(e) => self.fail(e),
        }
    }

    pub async fn set_last_notification_check(
        &mut self,
        checked_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        match self.facade.set_last_notification_check(checked_at).await {
            Ok(()) => {
                self.apply(AppAction::SetLastNotificationCheck(Some(checked_at)));
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }
}
