//! Reminder copy, keyed off whole days elapsed

use crate::notifications::Permission;

/// Title and body for one reminder notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderMessage {
    pub title: String,
    pub body: String,
}

/// Pick the reminder wording for the elapsed time since the last shower
///
/// Fractional days are floored, so the tone only escalates once a full
/// day boundary has passed.
pub fn reminder_message(days_since_last_shower: f64) -> ReminderMessage {
    let days = days_since_last_shower.floor() as i64;

    let (title, body) = if days == 1 {
        (
            "🚿 Shower Reminder",
            "It's been a day since your last shower. Time to freshen up!".to_string(),
        )
    } else if days == 2 {
        (
            "🚿 Shower Reminder",
            "It's been 2 days since your last shower. Your skin will thank you!".to_string(),
        )
    } else if days == 3 {
        (
            "🚿 Shower Reminder",
            "It's been 3 days since your last shower. Time for some self-care!".to_string(),
        )
    } else if days <= 7 {
        (
            "🚿 Shower Reminder",
            format!("It's been {} days since your last shower. Let's get clean!", days),
        )
    } else if days <= 14 {
        (
            "🚿 Shower Time!",
            format!(
                "It's been {} days since your last shower. Your friends are starting to notice! 😅",
                days
            ),
        )
    } else {
        (
            "🚿 Urgent Shower Reminder!",
            format!(
                "It's been {} days since your last shower. Time for an intervention! 🛁",
                days
            ),
        )
    };

    ReminderMessage {
        title: title.to_string(),
        body,
    }
}

/// Plain-text reminder for when native notifications are unavailable
pub fn fallback_message(days_since_last_shower: f64) -> String {
    let days = days_since_last_shower.floor() as i64;

    if days == 1 {
        "⏰ Reminder: It's been a day since your last shower!".to_string()
    } else if days <= 3 {
        format!("⏰ Reminder: It's been {} days since your last shower!", days)
    } else if days <= 7 {
        format!(
            "⏰ Reminder: It's been {} days since your last shower. Time to freshen up!",
            days
        )
    } else {
        format!("⏰ Urgent: It's been {} days since your last shower!", days)
    }
}

/// One-line status for the settings screen
pub fn permission_status_message(permission: Permission) -> &'static str {
    match permission {
        Permission::Granted => "Notifications are enabled and working.",
        Permission::Denied => {
            "Notifications are blocked. Please enable them in your browser settings \
             to receive shower reminders."
        }
        Permission::Default => "Click to enable notifications for shower reminders.",
    }
}
