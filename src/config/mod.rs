//! Per-form export configuration
//!
//! An [`ExportConfiguration`] holds one form's export settings: output
//! directory, optional PEM key file, optional inclusive date range and the
//! pull-before-export flags. Configurations are value objects: edits replace
//! the whole configuration, there is no partial in-place mutation.
//!
//! Configurations persist to the preference store as individually-prefixed
//! keys (`custom_<formId>_<field>`), so a round trip through
//! [`ExportConfiguration::save`] and [`ExportConfiguration::load`] with the
//! same prefix yields identical field values.

use crate::archive::DirectoryPolicy;
use crate::domain::{ExportError, Result};
use crate::prefs::PreferenceStore;
use chrono::NaiveDate;
use std::path::PathBuf;

const KEY_EXPORT_DIR: &str = "export_dir";
const KEY_PEM_FILE: &str = "pem_file";
const KEY_START_DATE: &str = "start_date";
const KEY_END_DATE: &str = "end_date";
const KEY_PULL_BEFORE: &str = "pull_before";
const KEY_PULL_BEFORE_OVERRIDES: &str = "pull_before_overrides_default";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One form's export settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportConfiguration {
    /// Output directory for produced CSV files
    pub export_dir: Option<PathBuf>,

    /// PEM file supplying the private key, required for encrypted forms
    pub pem_file: Option<PathBuf>,

    /// Inclusive export start date
    pub start_date: Option<NaiveDate>,

    /// Inclusive export end date
    pub end_date: Option<NaiveDate>,

    /// Pull new submissions from the remote server before exporting
    pub pull_before: bool,

    /// When this configuration overrides a default, whether `pull_before`
    /// follows the default instead of this configuration's own flag
    pub pull_before_overrides_default: bool,
}

impl ExportConfiguration {
    /// Create an empty configuration
    pub fn empty() -> Self {
        Self::default()
    }

    /// True iff every optional field is unset and both flags are false
    pub fn is_empty(&self) -> bool {
        self.export_dir.is_none()
            && self.pem_file.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && !self.pull_before
            && !self.pull_before_overrides_default
    }

    /// Check the configuration against the validity rules
    ///
    /// A usable configuration has an export directory that exists, is a real
    /// directory and sits outside reserved storage paths; a start date no
    /// later than the end date when both are set; and a PEM path whenever the
    /// form is encrypted.
    pub fn validate(&self, policy: &DirectoryPolicy, form_encrypted: bool) -> Result<()> {
        match &self.export_dir {
            None => {
                return Err(ExportError::InvalidOutputDirectory(
                    "no export directory configured".to_string(),
                ))
            }
            Some(dir) => policy.check_export_dir(dir)?,
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ExportError::InvalidDateRange { start, end });
            }
        }

        if form_encrypted && self.pem_file.is_none() {
            return Err(ExportError::MissingCredentialConfig);
        }

        Ok(())
    }

    /// Whether [`Self::validate`] succeeds
    pub fn is_valid(&self, policy: &DirectoryPolicy, form_encrypted: bool) -> bool {
        self.validate(policy, form_encrypted).is_ok()
    }

    /// Reconstruct a configuration from prefixed keys in the preference store
    ///
    /// Absent keys leave the corresponding field unset. A malformed date or
    /// flag value fails the whole load with [`ExportError::ConfigParse`].
    pub fn load(store: &dyn PreferenceStore, key_prefix: &str) -> Result<Self> {
        let get = |field: &str| store.get(&format!("{key_prefix}{field}"));

        let parse_date = |field: &str| -> Result<Option<NaiveDate>> {
            match get(field) {
                None => Ok(None),
                Some(raw) => NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                    .map(Some)
                    .map_err(|e| {
                        ExportError::ConfigParse(format!(
                            "malformed date '{raw}' for {key_prefix}{field}: {e}"
                        ))
                    }),
            }
        };

        let parse_flag = |field: &str| -> Result<bool> {
            match get(field) {
                None => Ok(false),
                Some(raw) => raw.parse::<bool>().map_err(|_| {
                    ExportError::ConfigParse(format!(
                        "malformed flag '{raw}' for {key_prefix}{field}"
                    ))
                }),
            }
        };

        Ok(Self {
            export_dir: get(KEY_EXPORT_DIR).map(PathBuf::from),
            pem_file: get(KEY_PEM_FILE).map(PathBuf::from),
            start_date: parse_date(KEY_START_DATE)?,
            end_date: parse_date(KEY_END_DATE)?,
            pull_before: parse_flag(KEY_PULL_BEFORE)?,
            pull_before_overrides_default: parse_flag(KEY_PULL_BEFORE_OVERRIDES)?,
        })
    }

    /// Persist the configuration under prefixed keys
    ///
    /// Unset fields remove any previously stored key, so saving is a
    /// wholesale replace like every other configuration edit.
    pub fn save(&self, store: &dyn PreferenceStore, key_prefix: &str) -> Result<()> {
        let put_or_remove = |field: &str, value: Option<String>| -> Result<()> {
            let key = format!("{key_prefix}{field}");
            match value {
                Some(v) => store.put(&key, &v),
                None => store.remove(&key),
            }
        };

        put_or_remove(
            KEY_EXPORT_DIR,
            self.export_dir
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        )?;
        put_or_remove(
            KEY_PEM_FILE,
            self.pem_file
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        )?;
        put_or_remove(
            KEY_START_DATE,
            self.start_date.map(|d| d.format(DATE_FORMAT).to_string()),
        )?;
        put_or_remove(
            KEY_END_DATE,
            self.end_date.map(|d| d.format(DATE_FORMAT).to_string()),
        )?;
        put_or_remove(
            KEY_PULL_BEFORE,
            self.pull_before.then(|| "true".to_string()),
        )?;
        put_or_remove(
            KEY_PULL_BEFORE_OVERRIDES,
            self.pull_before_overrides_default.then(|| "true".to_string()),
        )?;
        Ok(())
    }
}
