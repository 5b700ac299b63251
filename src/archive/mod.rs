//! Local archive access
//!
//! The archive is the storage directory that field data is pulled into. This
//! module covers the filesystem collaborators the export engine needs:
//!
//! - **Form discovery**: scan `<storage>/forms/*/form.json` manifests into
//!   [`Form`] records, in stable directory order.
//! - **Directory policy**: the "is this output directory usable" checks,
//!   including the reserved-path predicate that rejects export directories
//!   nested inside the archive's own storage area.
//! - **Submission records**: the on-disk submission format read by the CSV
//!   converter, including the encrypted envelope variant.

use crate::domain::{ExportError, Form, FormId, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the per-form manifest file inside each form directory
pub const FORM_MANIFEST: &str = "form.json";

/// Name of the directory holding a form's submission files
pub const SUBMISSIONS_DIR: &str = "submissions";

/// On-disk form manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormManifest {
    /// Stable form identifier
    pub id: FormId,

    /// Display name
    pub name: String,

    /// File-level encryption flag
    #[serde(default)]
    pub file_encrypted: bool,

    /// Field-level encryption flag
    #[serde(default)]
    pub field_encrypted: bool,
}

impl FormManifest {
    /// Convert the manifest into a registry [`Form`] record
    pub fn into_form(self) -> Form {
        Form::new(self.id, self.name, self.file_encrypted, self.field_encrypted)
    }
}

/// One stored form submission
///
/// Either `fields` (plaintext forms) or `envelope` (encrypted forms) is
/// present. Field names map to CSV columns; `BTreeMap` keeps column order
/// stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// Unique submission instance identifier
    pub instance_id: String,

    /// When the submission was collected
    pub submission_date: DateTime<Utc>,

    /// Plaintext field values
    #[serde(default)]
    pub fields: Option<BTreeMap<String, String>>,

    /// Encrypted field payload
    #[serde(default)]
    pub envelope: Option<EncryptedEnvelope>,
}

/// Encrypted submission payload
///
/// The symmetric key is wrapped with the form's RSA public key; the field
/// map is sealed with AES-256-GCM under that key. All binary members are
/// base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// RSA-wrapped AES-256 key
    pub encrypted_key: String,

    /// 96-bit GCM nonce
    pub nonce: String,

    /// Sealed JSON field map
    pub encrypted_fields: String,
}

/// Discover the forms present in an archive
///
/// Scans `<storage_root>/forms/*/form.json`. Directories without a readable
/// manifest are skipped with a warning; a missing `forms/` directory yields
/// an empty list. Directory name order is the discovery order, which the
/// registry preserves as display order.
pub fn discover_forms(storage_root: &Path) -> Result<Vec<Form>> {
    let forms_dir = storage_root.join("forms");
    if !forms_dir.is_dir() {
        tracing::debug!(path = %forms_dir.display(), "No forms directory in archive");
        return Ok(Vec::new());
    }

    let mut dirs: Vec<PathBuf> = std::fs::read_dir(&forms_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    let mut forms = Vec::new();
    for dir in dirs {
        match read_manifest(&dir) {
            Ok(manifest) => forms.push(manifest.into_form()),
            Err(e) => {
                tracing::warn!(
                    path = %dir.display(),
                    error = %e,
                    "Skipping form directory with unreadable manifest"
                );
            }
        }
    }

    tracing::info!(count = forms.len(), "Discovered forms in archive");
    Ok(forms)
}

/// Locate the directory of a form by identifier
///
/// Returns `None` if no manifest in the archive carries the identifier.
pub fn form_dir(storage_root: &Path, form_id: &FormId) -> Result<Option<PathBuf>> {
    let forms_dir = storage_root.join("forms");
    if !forms_dir.is_dir() {
        return Ok(None);
    }
    for entry in std::fs::read_dir(&forms_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Ok(manifest) = read_manifest(&path) {
            if &manifest.id == form_id {
                return Ok(Some(path));
            }
        }
    }
    Ok(None)
}

/// Read all submission records of one form, in file-name order
pub fn read_submissions(form_dir: &Path) -> Result<Vec<SubmissionRecord>> {
    let submissions_dir = form_dir.join(SUBMISSIONS_DIR);
    if !submissions_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(&submissions_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        let content = std::fs::read_to_string(&path)?;
        let record: SubmissionRecord = serde_json::from_str(&content).map_err(|e| {
            ExportError::Converter(format!(
                "malformed submission file {}: {e}",
                path.display()
            ))
        })?;
        records.push(record);
    }
    Ok(records)
}

fn read_manifest(dir: &Path) -> Result<FormManifest> {
    let path = dir.join(FORM_MANIFEST);
    let content = std::fs::read_to_string(&path)?;
    serde_json::from_str(&content).map_err(|e| {
        ExportError::ConfigParse(format!("malformed form manifest {}: {e}", path.display()))
    })
}

/// Output directory checks
///
/// An export directory is usable when it exists, is a real directory and is
/// not nested inside a reserved application-storage root. The archive's
/// storage directory is always reserved so an export cannot silently write
/// into the data it reads from.
#[derive(Debug, Clone, Default)]
pub struct DirectoryPolicy {
    reserved_roots: Vec<PathBuf>,
}

impl DirectoryPolicy {
    /// Policy reserving only the given storage root
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            reserved_roots: vec![storage_root.into()],
        }
    }

    /// Policy with no reserved roots (embedding callers supply their own)
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Add a further reserved root
    pub fn with_reserved(mut self, root: impl Into<PathBuf>) -> Self {
        self.reserved_roots.push(root.into());
        self
    }

    /// Whether the path is nested under (or equal to) a reserved root
    ///
    /// Comparison is on canonicalized paths where possible, falling back to
    /// lexical comparison when a path cannot be canonicalized.
    pub fn is_reserved(&self, path: &Path) -> bool {
        let candidate = canonical_or_lexical(path);
        self.reserved_roots
            .iter()
            .any(|root| candidate.starts_with(canonical_or_lexical(root)))
    }

    /// Whether the path is an existing, non-reserved directory
    pub fn is_usable_dir(&self, path: &Path) -> bool {
        path.is_dir() && !self.is_reserved(path)
    }

    /// Like [`Self::is_usable_dir`], with a typed reason on rejection
    pub fn check_export_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ExportError::InvalidOutputDirectory(format!(
                "{} does not exist",
                path.display()
            )));
        }
        if !path.is_dir() {
            return Err(ExportError::InvalidOutputDirectory(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        if self.is_reserved(path) {
            return Err(ExportError::InvalidOutputDirectory(format!(
                "{} is inside a reserved storage directory",
                path.display()
            )));
        }
        Ok(())
    }
}

fn canonical_or_lexical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
