//! Export progress notifications
//!
//! Each export job stage emits a typed event to an [`EventSink`]. Sinks are
//! observers only: the job's transitions never wait on or branch on
//! subscriber behavior. The default [`LogSink`] forwards everything to
//! `tracing`; a GUI front end would register its own sink to drive a status
//! column.

use crate::domain::FormId;
use crate::export::job::JobStage;

/// One progress or outcome notification from an export job
#[derive(Debug, Clone)]
pub enum ExportEvent {
    /// A job stage began for a form
    StageStarted { form_id: FormId, stage: JobStage },

    /// The form's PEM file yielded a usable private key
    CredentialResolved { form_id: FormId },

    /// The job reached a terminal failure
    Failed { form_id: FormId, message: String },

    /// The job completed and the watermark was stamped
    Succeeded { form_id: FormId, written: usize },
}

/// Observer of export job progress
pub trait EventSink: Send + Sync {
    /// Receive one event; must not block
    fn notify(&self, event: &ExportEvent);
}

/// Sink that forwards events to the tracing subscriber
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn notify(&self, event: &ExportEvent) {
        match event {
            ExportEvent::StageStarted { form_id, stage } => {
                tracing::debug!(form_id = %form_id, stage = ?stage, "Export stage started");
            }
            ExportEvent::CredentialResolved { form_id } => {
                tracing::info!(form_id = %form_id, "Successfully parsed PEM file");
            }
            ExportEvent::Failed { form_id, message } => {
                tracing::warn!(form_id = %form_id, message = %message, "Export failed");
            }
            ExportEvent::Succeeded { form_id, written } => {
                tracing::info!(form_id = %form_id, written = written, "Export succeeded");
            }
        }
    }
}
