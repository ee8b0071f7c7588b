//! Shower reminder notifications
//!
//! The decision of *whether* to remind is a pure function in [`scheduler`];
//! the wording lives in [`messages`]; actually putting a notification on
//! screen goes through the [`NotificationPort`] trait so the hosting shell
//! owns the platform API and tests can script outcomes.

pub mod messages;
pub mod scheduler;

pub use messages::{fallback_message, permission_status_message, reminder_message, ReminderMessage};
pub use scheduler::{should_notify, NotificationScheduler, CHECK_INTERVAL, STARTUP_CHECK_DELAY};

use async_trait::async_trait;
use thiserror::Error;

/// Tag shared by every reminder so a new one replaces the old
pub const NOTIFICATION_TAG: &str = "shower-reminder";

/// Errors that can occur while showing notifications
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notifications are not supported on this platform")]
    Unsupported,

    #[error("Failed to display notification: {0}")]
    Display(String),
}

/// The user's standing answer to the permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Never asked, or the user deferred
    Default,
    Granted,
    Denied,
}

/// One notification as handed to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    /// Same-tag notifications replace each other instead of stacking
    pub tag: String,
    /// Keep the notification on screen until the user interacts with it
    pub require_interaction: bool,
}

impl NotificationRequest {
    /// A standard shower reminder; auto-dismisses like the rest
    pub fn reminder(message: ReminderMessage) -> Self {
        Self {
            title: message.title,
            body: message.body,
            tag: NOTIFICATION_TAG.to_string(),
            require_interaction: false,
        }
    }
}

/// What the scheduler needs from the platform's notification API
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Current permission without prompting
    fn permission(&self) -> Permission;

    /// Prompt the user; returns the resulting permission. Platforms that
    /// do not support notifications answer [`Permission::Denied`].
    async fn request_permission(&self) -> Permission;

    /// Display a notification, replacing any earlier one with the same tag
    async fn show(&self, request: &NotificationRequest) -> Result<(), NotificationError>;
}
