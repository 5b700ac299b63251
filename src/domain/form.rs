//! Form model
//!
//! A [`Form`] describes one data-collection instrument discovered in the
//! local archive: its stable identifier, display name, encryption flags and
//! the mutable per-form state (selection flag, status log) maintained by the
//! registry.
//!
//! Forms are owned by [`crate::registry::FormRegistry`] and mutated only
//! through registry methods under the registry's lock. Code outside the
//! registry works on cloned snapshots.

use crate::domain::ids::FormId;
use serde::{Deserialize, Serialize};

/// One entry of a form's human-readable status log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Outcome message of one export attempt
    pub message: String,

    /// Whether the attempt succeeded
    pub success: bool,
}

impl StatusEntry {
    /// Create a new status entry
    pub fn new(message: impl Into<String>, success: bool) -> Self {
        Self {
            message: message.into(),
            success,
        }
    }
}

/// One data-collection form tracked by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    /// Stable form identifier
    pub id: FormId,

    /// Human-readable display name
    pub name: String,

    /// Whether submissions are encrypted at the file level
    pub file_encrypted: bool,

    /// Whether individual fields are encrypted
    pub field_encrypted: bool,

    /// Whether the form participates in batch operations
    #[serde(default)]
    pub selected: bool,

    /// Export outcome log, most recent entry last
    #[serde(default)]
    pub status_log: Vec<StatusEntry>,
}

impl Form {
    /// Create a new unselected form with an empty status log
    pub fn new(
        id: FormId,
        name: impl Into<String>,
        file_encrypted: bool,
        field_encrypted: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            file_encrypted,
            field_encrypted,
            selected: false,
            status_log: Vec::new(),
        }
    }

    /// Whether exporting this form requires a decryption credential
    pub fn is_encrypted(&self) -> bool {
        self.file_encrypted || self.field_encrypted
    }

    /// Most recent status entry, if any export has been attempted
    pub fn last_status(&self) -> Option<&StatusEntry> {
        self.status_log.last()
    }
}
