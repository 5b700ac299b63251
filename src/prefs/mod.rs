//! Preference store boundary
//!
//! The preference store is an external collaborator: a simple string
//! key-value store used to persist per-form export configurations and
//! last-export watermarks across restarts. The [`PreferenceStore`] trait is
//! the contract; [`JsonFilePreferences`] is the file-backed implementation
//! used by the CLI and [`MemoryPreferences`] backs tests.
//!
//! Keys are namespaced to avoid collisions between configuration fields and
//! other stored preferences:
//!
//! - `custom_<formId>_<field>` for configuration fields
//! - `export_date_<formId>` for the last-export timestamp (ISO-8601)

use crate::domain::{ExportError, FormId, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Build the key prefix under which one form's configuration fields live
pub fn configuration_prefix(form_id: &FormId) -> String {
    format!("custom_{}_", form_id.as_str())
}

/// Build the key under which one form's last-export timestamp lives
pub fn export_date_key(form_id: &FormId) -> String {
    format!("export_date_{}", form_id.as_str())
}

/// String key-value store for export settings and watermarks
pub trait PreferenceStore: Send + Sync {
    /// Read a value, `None` if the key was never stored
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value, replacing any previous one
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key; deleting an absent key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory preference store
///
/// Volatile implementation for tests and embedding callers that manage
/// persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryPreferences {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("preference lock poisoned")
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .expect("preference lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .expect("preference lock poisoned")
            .remove(key);
        Ok(())
    }
}

/// JSON-file-backed preference store
///
/// The whole map is held in memory and rewritten to disk on every mutation.
/// Preference files are small (a handful of keys per form), so rewriting is
/// cheaper than it sounds and keeps the on-disk state consistent after every
/// `put`.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFilePreferences {
    /// Open a preference file, creating an empty store if it does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| {
                ExportError::Preferences(format!(
                    "malformed preference file {}: {e}",
                    path.display()
                ))
            })?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| ExportError::Preferences(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("preference lock poisoned")
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().expect("preference lock poisoned");
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().expect("preference lock poisoned");
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}
