//! Domain error types
//!
//! This module defines the error hierarchy for Fieldcase. All errors are
//! domain-specific and don't expose third-party types.
//!
//! Two propagation classes exist:
//!
//! - Configuration-time errors ([`ExportError::InvalidDateRange`],
//!   [`ExportError::InvalidOutputDirectory`]) are reported synchronously to
//!   the caller before any export job starts.
//! - Runtime job errors ([`CredentialError`],
//!   [`ExportError::MissingCredentialConfig`], [`ExportError::Converter`])
//!   are caught per form inside the export job, recorded on the form's status
//!   log, and never cross form boundaries in a batch.
//!
//! [`ExportError::FormNotFound`] is a programming/integration error (a stale
//! or foreign identifier reached the registry) and is fatal to the operation
//! that raised it.

use crate::domain::ids::FormId;
use chrono::NaiveDate;
use thiserror::Error;

/// Main Fieldcase error type
#[derive(Debug, Error)]
pub enum ExportError {
    /// Identifier is not present in the form registry
    #[error("Form '{0}' not found in the archive")]
    FormNotFound(FormId),

    /// Encrypted form with no PEM file configured
    #[error("Missing PEM file configuration for encrypted form")]
    MissingCredentialConfig,

    /// Credential resolution errors
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Export start date is after the end date
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Output directory missing, not a directory, or inside a reserved path
    #[error("Invalid output directory: {0}")]
    InvalidOutputDirectory(String),

    /// Converter failure, passed through verbatim
    #[error("Converter error: {0}")]
    Converter(String),

    /// Malformed persisted value encountered while loading a configuration
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    /// Preference store read/write errors
    #[error("Preference store error: {0}")]
    Preferences(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors resolving a private key from a PEM file
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The PEM file does not exist
    #[error("PEM file not found: {0}")]
    FileMissing(std::path::PathBuf),

    /// No object could be parsed from the PEM content
    #[error("Can't parse PEM file: {0}")]
    ParseFailed(String),

    /// The PEM parsed but contained no private key
    #[error("No private key found in PEM file")]
    NoPrivateKey,
}

// Conversion from std::io::Error
impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err.to_string())
    }
}

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, ExportError>;
