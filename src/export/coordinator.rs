//! Batch coordinator
//!
//! Drives the export job runner across the set of selected forms with valid
//! configurations. Forms run with bounded parallelism; each job's decryption
//! and file writing is I/O- and CPU-bound, so the pool size is configurable
//! but capped. One form's failure never prevents the remaining forms from
//! running, and nothing orders forms relative to each other.
//!
//! There is no rollback: a form that wrote output files before a later stage
//! failed keeps those files.

use crate::archive::DirectoryPolicy;
use crate::domain::{FormId, Result};
use crate::export::job::ExportJobRunner;
use crate::export::summary::BatchSummary;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Upper bound on concurrently running form jobs
pub const MAX_PARALLEL_JOBS: usize = 8;

/// Runs export jobs over many forms
pub struct BatchCoordinator {
    runner: Arc<ExportJobRunner>,
    parallelism: usize,
}

impl BatchCoordinator {
    /// Create a coordinator that runs forms sequentially
    pub fn new(runner: Arc<ExportJobRunner>) -> Self {
        Self {
            runner,
            parallelism: 1,
        }
    }

    /// Set the worker-pool size, clamped to `1..=MAX_PARALLEL_JOBS`
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.clamp(1, MAX_PARALLEL_JOBS);
        self
    }

    /// Export every selected form that has a valid configuration
    ///
    /// Selected forms without a valid configuration are skipped here; the
    /// standard entry points validate configurations before starting a
    /// batch, so a skip at this level means the caller bypassed validation.
    ///
    /// # Errors
    ///
    /// Only programming errors propagated from the job runner
    /// ([`crate::domain::ExportError::FormNotFound`]); per-form failures
    /// land in the summary.
    pub async fn export_selected(
        &self,
        registry: &crate::registry::FormRegistry,
        policy: &DirectoryPolicy,
    ) -> Result<BatchSummary> {
        let started = Instant::now();
        let valid = registry.valid_configurations(policy);

        let mut runnable: Vec<FormId> = Vec::new();
        for form in registry.selected_forms() {
            if valid.contains_key(&form.id) {
                runnable.push(form.id);
            } else {
                tracing::warn!(
                    form_id = %form.id,
                    "Skipping selected form without a valid configuration"
                );
            }
        }

        tracing::info!(
            forms = runnable.len(),
            parallelism = self.parallelism,
            "Starting batch export"
        );

        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut tasks = JoinSet::new();
        for form_id in runnable {
            let config = valid
                .get(&form_id)
                .cloned()
                .unwrap_or_default();
            let runner = self.runner.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("batch semaphore closed");
                let outcome = runner.run(&form_id, &config).await;
                (form_id, outcome)
            });
        }

        let mut summary = BatchSummary::new();
        while let Some(joined) = tasks.join_next().await {
            let (form_id, outcome) = joined.map_err(|e| {
                crate::domain::ExportError::Converter(format!("export task panicked: {e}"))
            })?;
            summary.add_outcome(form_id, outcome?);
        }

        let summary = summary.with_duration(started.elapsed());
        summary.log_summary();
        Ok(summary)
    }
}
