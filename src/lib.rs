// Fieldcase - Bulk Form Submission Export Tool
// Copyright (c) 2026 Fieldcase Contributors
// Licensed under the MIT License

//! # Fieldcase - Bulk Form Submission Export
//!
//! Fieldcase exports collected form submissions from a local archive to CSV,
//! handling encrypted submissions, per-form export settings and incremental
//! export watermarks.
//!
//! ## Architecture
//!
//! Fieldcase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`export`] - Export jobs, batch coordination and progress events
//! - [`registry`] - In-memory catalogue of forms, settings and watermarks
//! - [`convert`] - Submission decryption and CSV output
//! - [`archive`] - On-disk archive layout and output directory policy
//! - [`config`] - Per-form export configuration
//! - [`credentials`] - Private key resolution from PEM files
//! - [`prefs`] - Persistent key-value preference store
//! - [`domain`] - Core domain types and errors
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fieldcase::archive::{self, DirectoryPolicy};
//! use fieldcase::convert::CsvConverter;
//! use fieldcase::export::{BatchCoordinator, ExportJobRunner};
//! use fieldcase::prefs::JsonFilePreferences;
//! use fieldcase::registry::FormRegistry;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = std::path::Path::new("/data/archive");
//!     let store = Arc::new(JsonFilePreferences::open("prefs.json")?);
//!
//!     let forms = archive::discover_forms(storage)?;
//!     let registry = Arc::new(FormRegistry::load(forms, store.as_ref())?);
//!     registry.select_all();
//!
//!     let runner = Arc::new(ExportJobRunner::new(
//!         registry.clone(),
//!         Arc::new(CsvConverter::new(storage)),
//!         store,
//!     ));
//!     let summary = BatchCoordinator::new(runner)
//!         .export_selected(&registry, &DirectoryPolicy::new(storage))
//!         .await?;
//!
//!     println!("Exported {} submissions", summary.total_written());
//!     Ok(())
//! }
//! ```
//!
//! ## Incremental Exports
//!
//! Each successful export stamps a per-form watermark that is persisted to the
//! preference store and restored on the next run, so a form's last export time
//! survives restarts.
//!
//! ## Error Handling
//!
//! Fieldcase uses the [`domain::ExportError`] type for all errors:
//!
//! ```rust,no_run
//! use fieldcase::domain::ExportError;
//!
//! fn example() -> Result<(), ExportError> {
//!     let _forms = fieldcase::archive::discover_forms("/data/archive".as_ref())?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod convert;
pub mod credentials;
pub mod domain;
pub mod export;
pub mod logging;
pub mod prefs;
pub mod registry;
