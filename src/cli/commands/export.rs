//! Export command implementation
//!
//! Exports one form (or every configured form) from the local archive to
//! CSV, recording per-form watermarks in the preference file.

use crate::archive::{self, DirectoryPolicy};
use crate::config::ExportConfiguration;
use crate::convert::CsvConverter;
use crate::domain::{ExportError, FormId};
use crate::export::{BatchCoordinator, ExportJobRunner, JobOutcome};
use crate::prefs::{self, JsonFilePreferences, PreferenceStore};
use crate::registry::FormRegistry;
use chrono::NaiveDate;
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Exit codes: 0 success, 1 export failure, 2 configuration error,
// 3 form not found.
const EXIT_OK: i32 = 0;
const EXIT_EXPORT_FAILED: i32 = 1;
const EXIT_CONFIG: i32 = 2;
const EXIT_FORM_NOT_FOUND: i32 = 3;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Archive storage directory
    #[arg(long)]
    pub storage_dir: PathBuf,

    /// Identifier of the form to export
    #[arg(long, conflicts_with = "all", required_unless_present = "all")]
    pub form_id: Option<String>,

    /// Export every form that has a stored valid configuration
    #[arg(long)]
    pub all: bool,

    /// Output directory for CSV files (overrides the stored configuration)
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Inclusive export start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Inclusive export end date (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// PEM file holding the private key of an encrypted form
    #[arg(long)]
    pub pem_file: Option<PathBuf>,

    /// Number of forms to export in parallel
    #[arg(long, default_value_t = 1)]
    pub parallel: usize,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(&self, prefs_path: &Path) -> anyhow::Result<i32> {
        tracing::info!(storage_dir = %self.storage_dir.display(), "Starting export command");

        let store: Arc<JsonFilePreferences> = Arc::new(JsonFilePreferences::open(prefs_path)?);
        let forms = archive::discover_forms(&self.storage_dir)?;
        let registry = match FormRegistry::load(forms, store.as_ref()) {
            Ok(registry) => Arc::new(registry),
            Err(e) => {
                eprintln!("Failed to restore stored settings: {e}");
                return Ok(EXIT_CONFIG);
            }
        };
        let policy = DirectoryPolicy::new(&self.storage_dir);

        if self.all {
            self.select_configured_forms(&registry, &policy);
        } else if let Some(raw_id) = &self.form_id {
            match self.prepare_single_form(raw_id, &registry, &policy, store.as_ref()) {
                Ok(()) => {}
                Err(code) => return Ok(code),
            }
        }

        if registry.none_selected() {
            println!("Nothing to export.");
            return Ok(EXIT_OK);
        }

        let runner = Arc::new(ExportJobRunner::new(
            registry.clone(),
            Arc::new(CsvConverter::new(&self.storage_dir)),
            store.clone(),
        ));
        let summary = BatchCoordinator::new(runner)
            .with_parallelism(self.parallel)
            .export_selected(&registry, &policy)
            .await?;

        println!("Export summary:");
        let mut lines: Vec<(&FormId, &JobOutcome)> = summary.outcomes.iter().collect();
        lines.sort_by_key(|(id, _)| id.as_str().to_string());
        for (form_id, outcome) in lines {
            match outcome {
                JobOutcome::Succeeded { stats, .. } => {
                    println!("  {form_id}: exported {} submissions", stats.written);
                }
                JobOutcome::Failed(e) => {
                    println!("  {form_id}: FAILED - {e}");
                }
            }
        }

        if summary.is_successful() {
            Ok(EXIT_OK)
        } else {
            Ok(EXIT_EXPORT_FAILED)
        }
    }

    /// Select every form whose stored configuration is valid
    fn select_configured_forms(&self, registry: &FormRegistry, policy: &DirectoryPolicy) {
        let valid = registry.valid_configurations(policy);
        for form in registry.forms() {
            if valid.contains_key(&form.id) {
                // Forms came out of the registry, the id cannot be stale.
                let _ = registry.set_selected(&form.id, true);
            }
        }
    }

    /// Resolve, override, validate and persist the single form's
    /// configuration; on failure returns the exit code to report
    fn prepare_single_form(
        &self,
        raw_id: &str,
        registry: &FormRegistry,
        policy: &DirectoryPolicy,
        store: &dyn PreferenceStore,
    ) -> Result<(), i32> {
        let form_id = match FormId::new(raw_id) {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Invalid form identifier: {e}");
                return Err(EXIT_CONFIG);
            }
        };
        let Some(form) = registry.form(&form_id) else {
            eprintln!("Form '{form_id}' not found in the archive");
            return Err(EXIT_FORM_NOT_FOUND);
        };

        let mut config = registry
            .get_configuration(&form_id)
            .map_err(|_| EXIT_FORM_NOT_FOUND)?;
        if let Some(dir) = &self.export_dir {
            config.export_dir = Some(dir.clone());
        }
        if self.start.is_some() {
            config.start_date = self.start;
        }
        if self.end.is_some() {
            config.end_date = self.end;
        }
        if let Some(pem) = &self.pem_file {
            config.pem_file = Some(pem.clone());
        }

        if let Err(e) = config.validate(policy, form.is_encrypted()) {
            eprintln!("Invalid export configuration for '{form_id}': {e}");
            return Err(match e {
                ExportError::MissingCredentialConfig => EXIT_EXPORT_FAILED,
                _ => EXIT_CONFIG,
            });
        }

        if let Err(e) = config.save(store, &prefs::configuration_prefix(&form_id)) {
            tracing::warn!(form_id = %form_id, error = %e, "Failed to persist configuration");
        }
        registry
            .set_configuration(&form_id, config)
            .map_err(|_| EXIT_FORM_NOT_FOUND)?;
        registry
            .set_selected(&form_id, true)
            .map_err(|_| EXIT_FORM_NOT_FOUND)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_args_defaults() {
        let args = ExportArgs {
            storage_dir: PathBuf::from("/data/archive"),
            form_id: Some("survey_v1".to_string()),
            all: false,
            export_dir: None,
            start: None,
            end: None,
            pem_file: None,
            parallel: 1,
        };

        assert!(!args.all);
        assert!(args.start.is_none());
        assert!(args.end.is_none());
        assert!(args.pem_file.is_none());
        assert_eq!(args.parallel, 1);
    }
}
