//! Periodic reminder checking
//!
//! The scheduler wakes up, asks [`should_notify`], and if the answer is
//! yes shows a reminder and records the check time so the next 12 hours
//! stay quiet. The decision itself is a pure function of settings,
//! permission, and timestamps.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::domain::{SettingsUpdate, UserSettings};
use crate::notifications::{
    reminder_message, NotificationPort, NotificationRequest, Permission,
};
use crate::state::StateStore;

/// How often the background check runs
pub const CHECK_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Delay before the first check after start, so boot work settles first
pub const STARTUP_CHECK_DELAY: Duration = Duration::from_secs(2);

/// Minimum quiet period between two reminders
const MIN_HOURS_BETWEEN_NOTIFICATIONS: f64 = 12.0;

/// Decide whether a reminder is due right now
///
/// The checks short-circuit in order: notifications enabled, permission
/// granted, a last shower exists, the elapsed time reaches the threshold,
/// and no reminder went out in the last 12 hours. Elapsed days compare
/// fractionally, so a 3-day threshold fires at exactly 72 hours.
pub fn should_notify(
    settings: &UserSettings,
    permission: Permission,
    last_shower: Option<DateTime<Utc>>,
    last_notification_check: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if !settings.notifications_enabled {
        return false;
    }
    if permission != Permission::Granted {
        return false;
    }
    let Some(last_shower) = last_shower else {
        return false;
    };

    let days_since_last_shower =
        (now - last_shower).num_milliseconds() as f64 / (1000.0 * 60.0 * 60.0 * 24.0);
    if days_since_last_shower < f64::from(settings.notification_threshold_days) {
        return false;
    }

    if let Some(last_check) = last_notification_check {
        let hours_since_last_check =
            (now - last_check).num_milliseconds() as f64 / (1000.0 * 60.0 * 60.0);
        if hours_since_last_check < MIN_HOURS_BETWEEN_NOTIFICATIONS {
            return false;
        }
    }

    true
}

/// Background reminder loop over the shared state store
///
/// Holds the store behind a mutex because the check runs from a spawned
/// task while the UI keeps issuing commands.
pub struct NotificationScheduler {
    store: Arc<Mutex<StateStore>>,
    port: Arc<dyn NotificationPort>,
    task: Option<JoinHandle<()>>,
}

impl NotificationScheduler {
    pub fn new(store: Arc<Mutex<StateStore>>, port: Arc<dyn NotificationPort>) -> Self {
        Self {
            store,
            port,
            task: None,
        }
    }

    /// Start the loop: one check right away, then every [`CHECK_INTERVAL`].
    /// Restarting replaces the previous loop and checks again immediately.
    pub fn start(&mut self) {
        self.stop();

        let store = self.store.clone();
        let port = self.port.clone();
        self.task = Some(tokio::spawn(async move {
            loop {
                Self::check_and_send(&store, &port).await;
                tokio::time::sleep(CHECK_INTERVAL).await;
            }
        }));
        tracing::info!("Started notification checking");
    }

    /// One-shot check [`STARTUP_CHECK_DELAY`] after boot, so boot work
    /// settles before the first reminder can appear
    pub fn spawn_startup_check(&self) -> JoinHandle<()> {
        let store = self.store.clone();
        let port = self.port.clone();
        tokio::spawn(async move {
            tokio::time::sleep(STARTUP_CHECK_DELAY).await;
            Self::check_and_send(&store, &port).await;
        })
    }

    /// Stop the loop; safe to call when not running
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("Stopped notification checking");
        }
    }

    /// Run one check immediately; returns whether a reminder was shown
    pub async fn check_now(&self) -> bool {
        Self::check_and_send(&self.store, &self.port).await
    }

    /// Ask the user for permission; on a grant, flip the settings flag on
    /// so reminders start flowing without a second step
    pub async fn request_permission(&self) -> Permission {
        let permission = self.port.request_permission().await;

        if permission == Permission::Granted {
            let mut store = self.store.lock().await;
            if let Err(e) = store
                .update_setting(SettingsUpdate::NotificationsEnabled(true))
                .await
            {
                tracing::error!("Permission granted but enabling reminders failed: {}", e);
            }
        }

        permission
    }

    async fn check_and_send(store: &Arc<Mutex<StateStore>>, port: &Arc<dyn NotificationPort>) -> bool {
        let mut store = store.lock().await;
        let state = store.state();
        let settings = state.settings.clone();
        let last_shower = state.showers.first().map(|s| s.timestamp);
        let last_check = state.last_notification_check;

        let now = Utc::now();
        if !should_notify(&settings, port.permission(), last_shower, last_check, now) {
            return false;
        }

        // should_notify guaranteed a last shower exists
        let Some(last_shower) = last_shower else {
            return false;
        };
        let days_since_last_shower =
            (now - last_shower).num_milliseconds() as f64 / (1000.0 * 60.0 * 60.0 * 24.0);

        let request = NotificationRequest::reminder(reminder_message(days_since_last_shower));
        if let Err(e) = port.show(&request).await {
            tracing::error!("Failed to show shower reminder: {}", e);
            return false;
        }

        // Record the check so the 12-hour quiet period starts now. A failed
        // write means the reminder may repeat next cycle, which beats
        // silently never reminding again.
        if let Err(e) = store.set_last_notification_check(now).await {
            tracing::warn!("Could not persist notification check time: {}", e);
        }

        tracing::info!("Shower reminder notification sent");
        true
    }
}

impl Drop for NotificationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
