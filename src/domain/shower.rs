//! ShowerEvent entity for tracking logged showers
//!
//! Each time the user logs a shower we create a ShowerEvent. The identity is
//! assigned by the store at creation and never changes; timestamp and notes
//! stay editable until the event is deleted.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single logged shower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowerEvent {
    /// Opaque, store-assigned identifier. Unique and stable for the lifetime
    /// of the event; the two stores assign different shapes (rowid string vs
    /// uuid) and callers must not interpret it.
    pub id: String,
    /// When the shower happened (defaults to creation time if the caller did
    /// not backdate it)
    pub timestamp: DateTime<Utc>,
    /// Optional free-form notes
    pub notes: Option<String>,
}

impl ShowerEvent {
    pub fn new(id: String, timestamp: DateTime<Utc>, notes: Option<String>) -> Self {
        Self {
            id,
            timestamp,
            notes,
        }
    }
}

/// Partial update for a shower event
///
/// Identity is immutable, so only timestamp and notes can change. `notes`
/// is doubly optional: `None` leaves the notes alone, `Some(None)` clears
/// them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShowerPatch {
    pub timestamp: Option<DateTime<Utc>>,
    pub notes: Option<Option<String>>,
}

impl ShowerPatch {
    /// Patch that only moves the timestamp
    pub fn timestamp(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }

    /// Patch that only replaces the notes
    pub fn notes(notes: Option<String>) -> Self {
        Self {
            notes: Some(notes),
            ..Self::default()
        }
    }

    /// Apply this patch to an event in place
    pub fn apply_to(&self, event: &mut ShowerEvent) {
        if let Some(timestamp) = self.timestamp {
            event.timestamp = timestamp;
        }
        if let Some(notes) = &self.notes {
            event.notes = notes.clone();
        }
    }
}

/// Render a timestamp in the fixed-width form both stores persist
///
/// Millisecond precision with a literal `Z` suffix keeps every stored value
/// the same length, so the SQLite timestamp index's lexicographic order is
/// exactly temporal order.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a timestamp previously written by [`format_timestamp`]
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn patch_moves_timestamp_and_keeps_notes() {
        let mut event = ShowerEvent::new(
            "1".to_string(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
            Some("Morning".to_string()),
        );

        let later = Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap();
        ShowerPatch::timestamp(later).apply_to(&mut event);

        assert_eq!(event.timestamp, later);
        assert_eq!(event.notes.as_deref(), Some("Morning"));
    }

    #[test]
    fn patch_can_clear_notes() {
        let mut event = ShowerEvent::new(
            "1".to_string(),
            Utc::now(),
            Some("Morning".to_string()),
        );

        ShowerPatch::notes(None).apply_to(&mut event);
        assert_eq!(event.notes, None);
    }

    #[test]
    fn timestamp_round_trips_at_fixed_width() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let text = format_timestamp(ts);
        assert_eq!(text, "2024-01-15T10:00:00.000Z");
        assert_eq!(parse_timestamp(&text).unwrap(), ts);
    }

    #[test]
    fn formatted_timestamps_sort_like_instants() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(250);
        assert!(format_timestamp(earlier) < format_timestamp(later));
    }
}
