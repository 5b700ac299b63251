//! Submission-to-CSV conversion
//!
//! The converter is an external collaborator from the export engine's point
//! of view: the [`Converter`] trait takes a form, an optional resolved
//! credential and a date filter, and either produces output files in the
//! export directory or fails. The job runner surfaces that outcome verbatim
//! and never looks inside.
//!
//! [`CsvConverter`] is the shipped implementation: it reads the form's
//! submission records from the archive, decrypts encrypted envelopes with
//! the credential, applies the inclusive date-range filter and writes one
//! `<form_id>.csv` per form.

use crate::archive::{self, EncryptedEnvelope, SubmissionRecord};
use crate::credentials::Credential;
use crate::domain::{ExportError, Form, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::NaiveDate;
use rsa::Pkcs1v15Encrypt;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Counters reported by a completed conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertStats {
    /// Submissions written to the output file
    pub written: usize,

    /// Submissions outside the date range
    pub skipped: usize,
}

/// Opaque conversion step invoked by the export job runner
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert one form's submissions into output files under `export_dir`
    async fn convert(
        &self,
        form: &Form,
        credential: Option<&Credential>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        export_dir: &Path,
    ) -> Result<ConvertStats>;
}

/// CSV converter reading submissions from the local archive
pub struct CsvConverter {
    storage_root: PathBuf,
}

impl CsvConverter {
    /// Create a converter over the given archive storage root
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
        }
    }

    fn decrypt_fields(
        credential: &Credential,
        envelope: &EncryptedEnvelope,
    ) -> Result<BTreeMap<String, String>> {
        let wrapped_key = BASE64
            .decode(&envelope.encrypted_key)
            .map_err(|e| ExportError::Converter(format!("bad encrypted_key encoding: {e}")))?;
        let nonce_bytes = BASE64
            .decode(&envelope.nonce)
            .map_err(|e| ExportError::Converter(format!("bad nonce encoding: {e}")))?;
        let ciphertext = BASE64
            .decode(&envelope.encrypted_fields)
            .map_err(|e| ExportError::Converter(format!("bad payload encoding: {e}")))?;

        let aes_key = credential
            .key()
            .decrypt(Pkcs1v15Encrypt, &wrapped_key)
            .map_err(|e| ExportError::Converter(format!("failed to unwrap submission key: {e}")))?;

        let cipher = Aes256Gcm::new_from_slice(&aes_key)
            .map_err(|_| ExportError::Converter("unwrapped key has wrong length".to_string()))?;
        if nonce_bytes.len() != 12 {
            return Err(ExportError::Converter(
                "submission nonce has wrong length".to_string(),
            ));
        }
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| ExportError::Converter("failed to decrypt submission".to_string()))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| ExportError::Converter(format!("decrypted payload is not valid: {e}")))
    }

    fn resolve_fields(
        record: &SubmissionRecord,
        credential: Option<&Credential>,
    ) -> Result<BTreeMap<String, String>> {
        if let Some(fields) = &record.fields {
            return Ok(fields.clone());
        }
        match (&record.envelope, credential) {
            (Some(envelope), Some(credential)) => Self::decrypt_fields(credential, envelope),
            (Some(_), None) => Err(ExportError::Converter(format!(
                "submission {} is encrypted but no credential was supplied",
                record.instance_id
            ))),
            (None, _) => Err(ExportError::Converter(format!(
                "submission {} carries neither fields nor an envelope",
                record.instance_id
            ))),
        }
    }

    fn in_range(
        record: &SubmissionRecord,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> bool {
        let day = record.submission_date.date_naive();
        if start_date.is_some_and(|start| day < start) {
            return false;
        }
        if end_date.is_some_and(|end| day > end) {
            return false;
        }
        true
    }

    fn write_csv(
        form: &Form,
        export_dir: &Path,
        rows: &[(String, String, BTreeMap<String, String>)],
    ) -> Result<PathBuf> {
        // Header is the union of field names across all exported rows,
        // sorted, after the two fixed columns.
        let mut columns: BTreeSet<&str> = BTreeSet::new();
        for (_, _, fields) in rows {
            columns.extend(fields.keys().map(String::as_str));
        }

        let output_path = export_dir.join(format!("{}.csv", form.id.as_str()));
        let mut writer = csv::Writer::from_path(&output_path)
            .map_err(|e| ExportError::Converter(e.to_string()))?;

        let mut header = vec!["instance_id", "submission_date"];
        header.extend(columns.iter().copied());
        writer
            .write_record(&header)
            .map_err(|e| ExportError::Converter(e.to_string()))?;

        for (instance_id, submitted, fields) in rows {
            let mut row = vec![instance_id.as_str(), submitted.as_str()];
            for column in &columns {
                row.push(fields.get(*column).map(String::as_str).unwrap_or(""));
            }
            writer
                .write_record(&row)
                .map_err(|e| ExportError::Converter(e.to_string()))?;
        }

        writer
            .flush()
            .map_err(|e| ExportError::Converter(e.to_string()))?;
        Ok(output_path)
    }
}

#[async_trait]
impl Converter for CsvConverter {
    async fn convert(
        &self,
        form: &Form,
        credential: Option<&Credential>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        export_dir: &Path,
    ) -> Result<ConvertStats> {
        let form_dir = archive::form_dir(&self.storage_root, &form.id)?
            .ok_or_else(|| ExportError::FormNotFound(form.id.clone()))?;
        let records = archive::read_submissions(&form_dir)?;

        let mut stats = ConvertStats::default();
        let mut rows = Vec::new();
        for record in &records {
            if !Self::in_range(record, start_date, end_date) {
                stats.skipped += 1;
                continue;
            }
            let fields = Self::resolve_fields(record, credential)?;
            rows.push((
                record.instance_id.clone(),
                record.submission_date.to_rfc3339(),
                fields,
            ));
        }

        let output_path = Self::write_csv(form, export_dir, &rows)?;
        stats.written = rows.len();

        tracing::info!(
            form_id = %form.id,
            written = stats.written,
            skipped = stats.skipped,
            output = %output_path.display(),
            "Converted submissions to CSV"
        );
        Ok(stats)
    }
}
