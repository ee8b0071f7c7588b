//! UserSettings singleton and its update surface
//!
//! Exactly one logical settings record exists at any time. A default
//! instance is synthesized the first time nothing is persisted, and older
//! persisted shapes missing newer fields are merged with defaults on load.

use serde::{Deserialize, Serialize};

/// Visual theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    /// Follow the platform's light/dark preference
    System,
}

/// Which day the calendar week starts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirstDayOfWeek {
    Sunday,
    Monday,
}

impl FirstDayOfWeek {
    /// Numeric form used by the primary store (0 = Sunday, 1 = Monday)
    pub fn as_index(self) -> i64 {
        match self {
            FirstDayOfWeek::Sunday => 0,
            FirstDayOfWeek::Monday => 1,
        }
    }

    pub fn from_index(index: i64) -> Self {
        match index {
            1 => FirstDayOfWeek::Monday,
            _ => FirstDayOfWeek::Sunday,
        }
    }
}

/// Informational project links shown on the about screen
///
/// Not functionally load-bearing; carried through persistence untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    #[serde(default = "default_github_repo")]
    pub github_repo: String,
    #[serde(default = "default_author")]
    pub author: String,
}

fn default_github_repo() -> String {
    "https://github.com/user/shower-tracker".to_string()
}

fn default_author() -> String {
    "Shower Tracker App".to_string()
}

impl Default for ProjectInfo {
    fn default() -> Self {
        Self {
            github_repo: default_github_repo(),
            author: default_author(),
        }
    }
}

/// The singleton user settings record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub theme: Theme,
    pub first_day_of_week: FirstDayOfWeek,
    pub notifications_enabled: bool,
    /// Days of inactivity before a reminder becomes eligible (positive)
    pub notification_threshold_days: u32,
    pub project_info: ProjectInfo,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            first_day_of_week: FirstDayOfWeek::Sunday,
            notifications_enabled: false,
            notification_threshold_days: 3,
            project_info: ProjectInfo::default(),
        }
    }
}

impl UserSettings {
    /// Return a copy with a single field replaced
    pub fn with_update(&self, update: SettingsUpdate) -> Self {
        let mut next = self.clone();
        update.apply_to(&mut next);
        next
    }
}

/// Single-field settings update
///
/// A closed set instead of a stringly keyed map, so an unknown field is a
/// compile error rather than a silent no-op.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsUpdate {
    Theme(Theme),
    FirstDayOfWeek(FirstDayOfWeek),
    NotificationsEnabled(bool),
    NotificationThresholdDays(u32),
}

impl SettingsUpdate {
    pub fn apply_to(&self, settings: &mut UserSettings) {
        match self {
            SettingsUpdate::Theme(theme) => settings.theme = *theme,
            SettingsUpdate::FirstDayOfWeek(day) => settings.first_day_of_week = *day,
            SettingsUpdate::NotificationsEnabled(enabled) => {
                settings.notifications_enabled = *enabled;
            }
            SettingsUpdate::NotificationThresholdDays(days) => {
                settings.notification_threshold_days = *days;
            }
        }
    }
}
