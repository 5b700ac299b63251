//! Batch summary and reporting
//!
//! Aggregates per-form job outcomes for the caller (CLI or GUI) to report.

use crate::convert::ConvertStats;
use crate::domain::{ExportError, FormId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

/// Terminal outcome of one form's export job
#[derive(Debug)]
pub enum JobOutcome {
    /// The converter ran and the watermark was stamped
    Succeeded {
        stats: ConvertStats,
        completed_at: DateTime<Utc>,
    },

    /// The job failed and the failure was recorded on the form's log
    Failed(ExportError),
}

impl JobOutcome {
    /// Whether this outcome is a success
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded { .. })
    }
}

/// Aggregate result of a batch export
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Outcome per form identifier
    pub outcomes: HashMap<FormId, JobOutcome>,

    /// Wall-clock duration of the batch
    pub duration: Duration,
}

impl BatchSummary {
    /// Create an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record one form's outcome
    pub fn add_outcome(&mut self, form_id: FormId, outcome: JobOutcome) {
        self.outcomes.insert(form_id, outcome);
    }

    /// Outcome of one form, if it ran in this batch
    pub fn outcome(&self, form_id: &FormId) -> Option<&JobOutcome> {
        self.outcomes.get(form_id)
    }

    /// Number of forms that succeeded
    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    /// Number of forms that failed
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Whether every form in the batch succeeded
    pub fn is_successful(&self) -> bool {
        self.failed() == 0
    }

    /// Total submissions written across all successful forms
    pub fn total_written(&self) -> usize {
        self.outcomes
            .values()
            .filter_map(|outcome| match outcome {
                JobOutcome::Succeeded { stats, .. } => Some(stats.written),
                JobOutcome::Failed(_) => None,
            })
            .sum()
    }

    /// Log a one-line summary of the batch
    pub fn log_summary(&self) {
        tracing::info!(
            forms = self.outcomes.len(),
            succeeded = self.succeeded(),
            failed = self.failed(),
            written = self.total_written(),
            duration_ms = self.duration.as_millis(),
            "Batch export finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> FormId {
        FormId::new(s).unwrap()
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = BatchSummary::new();
        summary.add_outcome(
            id("a"),
            JobOutcome::Succeeded {
                stats: ConvertStats {
                    written: 3,
                    skipped: 1,
                },
                completed_at: Utc::now(),
            },
        );
        summary.add_outcome(
            id("b"),
            JobOutcome::Failed(ExportError::MissingCredentialConfig),
        );

        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.total_written(), 3);
        assert!(!summary.is_successful());
        assert!(summary.outcome(&id("a")).unwrap().is_success());
        assert!(summary.outcome(&id("c")).is_none());
    }

    #[test]
    fn test_empty_summary_is_successful() {
        let summary = BatchSummary::new().with_duration(Duration::from_millis(5));
        assert!(summary.is_successful());
        assert_eq!(summary.duration, Duration::from_millis(5));
    }
}
