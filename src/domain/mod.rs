//! Domain module containing the core data model
//!
//! This module defines the record kinds the app persists (shower events,
//! user settings, free-form metadata) together with their defaults and the
//! full-state export payload.

pub mod metadata;
pub mod settings;
pub mod shower;

// Re-export public types for easy access
pub use metadata::*;
pub use settings::*;
pub use shower::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Full-state export for backup and debugging
///
/// Produced by the storage facade from whichever store is active, so the
/// shape is identical regardless of where the data lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub showers: Vec<ShowerEvent>,
    pub settings: UserSettings,
    pub metadata: BTreeMap<String, String>,
}
