//! Export orchestration
//!
//! This module provides the core export logic for Fieldcase:
//! - Per-form export job runner and its stage protocol
//! - Batch coordination across selected forms
//! - Progress events and batch summaries

pub mod coordinator;
pub mod events;
pub mod job;
pub mod summary;

pub use coordinator::{BatchCoordinator, MAX_PARALLEL_JOBS};
pub use events::{EventSink, ExportEvent, LogSink};
pub use job::{ExportJobRunner, JobStage};
pub use summary::{BatchSummary, JobOutcome};
