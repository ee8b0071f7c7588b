//! Free-form metadata records
//!
//! A small string key/value map used for app bookkeeping. The one well-known
//! key holds the timestamp of the last notification evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key under which the last notification evaluation time is stored
pub const LAST_NOTIFICATION_CHECK_KEY: &str = "last_notification_check";

/// One metadata value with its last-modified stamp
///
/// Setting an existing key replaces the value and bumps `updated_at` rather
/// than inserting a duplicate record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataValue {
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl MetadataValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            updated_at: Utc::now(),
        }
    }
}
