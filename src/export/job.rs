//! Export job runner
//!
//! Runs the per-form export protocol as a fixed stage sequence:
//! encryption check, credential resolution (encrypted forms only), range
//! check, delegation to the converter, outcome recording.
//!
//! Terminal outcomes are [`JobOutcome::Succeeded`] and
//! [`JobOutcome::Failed`]. Every failure inside the job is caught, recorded
//! on the form's status log via the registry, and returned as a `Failed`
//! outcome; the only error the runner propagates is
//! [`ExportError::FormNotFound`], which marks a caller bug rather than a
//! job failure.

use crate::config::ExportConfiguration;
use crate::convert::Converter;
use crate::credentials::{self, Credential};
use crate::domain::{ExportError, FormId, Result};
use crate::export::events::{EventSink, ExportEvent, LogSink};
use crate::export::summary::JobOutcome;
use crate::prefs::{self, PreferenceStore};
use crate::registry::FormRegistry;
use std::sync::Arc;

/// Stages of one form's export job, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    /// Inspect the form's encryption flags
    EncryptionCheck,

    /// Resolve the private key from the configured PEM file
    CredentialResolution,

    /// Re-check the configured date range
    RangeCheck,

    /// Invoke the converter
    Delegated,

    /// Record the outcome and persist the watermark
    Recorded,
}

/// Runs the export protocol for single forms
pub struct ExportJobRunner {
    registry: Arc<FormRegistry>,
    converter: Arc<dyn Converter>,
    store: Arc<dyn PreferenceStore>,
    events: Arc<dyn EventSink>,
}

impl ExportJobRunner {
    /// Create a runner that reports progress to the tracing subscriber
    pub fn new(
        registry: Arc<FormRegistry>,
        converter: Arc<dyn Converter>,
        store: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            registry,
            converter,
            store,
            events: Arc::new(LogSink),
        }
    }

    /// Replace the event sink
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Run the export job for one form
    ///
    /// The configuration is normally pre-validated through the registry;
    /// the in-job range and directory checks repeat that validation so the
    /// job also fails cleanly on a raw configuration.
    ///
    /// # Errors
    ///
    /// Only [`ExportError::FormNotFound`]; every other failure is recorded
    /// and returned inside [`JobOutcome::Failed`].
    pub async fn run(
        &self,
        form_id: &FormId,
        config: &ExportConfiguration,
    ) -> Result<JobOutcome> {
        let form = self
            .registry
            .form(form_id)
            .ok_or_else(|| ExportError::FormNotFound(form_id.clone()))?;

        self.stage(form_id, JobStage::EncryptionCheck);
        let credential: Option<Credential> = if form.is_encrypted() {
            self.stage(form_id, JobStage::CredentialResolution);
            let Some(pem_path) = &config.pem_file else {
                return self.fail(form_id, ExportError::MissingCredentialConfig);
            };
            match credentials::resolve(pem_path) {
                Ok(credential) => {
                    self.events
                        .notify(&ExportEvent::CredentialResolved {
                            form_id: form_id.clone(),
                        });
                    // Held for this run only; dropped with the job.
                    Some(credential)
                }
                Err(e) => return self.fail(form_id, e.into()),
            }
        } else {
            None
        };

        // RangeCheck
        self.stage(form_id, JobStage::RangeCheck);
        if let (Some(start), Some(end)) = (config.start_date, config.end_date) {
            if start > end {
                return self.fail(form_id, ExportError::InvalidDateRange { start, end });
            }
        }

        // Delegated
        self.stage(form_id, JobStage::Delegated);
        let Some(export_dir) = &config.export_dir else {
            return self.fail(
                form_id,
                ExportError::InvalidOutputDirectory("no export directory configured".to_string()),
            );
        };
        let stats = match self
            .converter
            .convert(
                &form,
                credential.as_ref(),
                config.start_date,
                config.end_date,
                export_dir,
            )
            .await
        {
            Ok(stats) => stats,
            Err(e) => return self.fail(form_id, e),
        };

        // Recorded
        self.stage(form_id, JobStage::Recorded);
        let message = format!("Exported {} submissions to CSV", stats.written);
        let completed_at = self
            .registry
            .record_outcome(form_id, &message, true)?
            .unwrap_or_else(chrono::Utc::now);

        // Persist the watermark so restarts resume from it. A failed write
        // loses the restart watermark but not this run's outcome.
        if let Err(e) = self
            .store
            .put(&prefs::export_date_key(form_id), &completed_at.to_rfc3339())
        {
            tracing::warn!(form_id = %form_id, error = %e, "Failed to persist export watermark");
        }

        self.events.notify(&ExportEvent::Succeeded {
            form_id: form_id.clone(),
            written: stats.written,
        });
        Ok(JobOutcome::Succeeded {
            stats,
            completed_at,
        })
    }

    fn stage(&self, form_id: &FormId, stage: JobStage) {
        self.events.notify(&ExportEvent::StageStarted {
            form_id: form_id.clone(),
            stage,
        });
    }

    fn fail(&self, form_id: &FormId, error: ExportError) -> Result<JobOutcome> {
        let message = error.to_string();
        self.registry.record_outcome(form_id, &message, false)?;
        self.events.notify(&ExportEvent::Failed {
            form_id: form_id.clone(),
            message,
        });
        Ok(JobOutcome::Failed(error))
    }
}
