//! Logging and observability
//!
//! Structured console logging with the `tracing` crate and an environment
//! filter. The CLI initializes this once at startup; tests rely on the
//! default subscriber.
//!
//! # Example
//!
//! ```no_run
//! use fieldcase::logging::init_logging;
//!
//! init_logging("info").expect("Failed to initialize logging");
//! tracing::info!("Application started");
//! ```

use crate::domain::{ExportError, Result};
use tracing_subscriber::EnvFilter;

const VALID_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Initialize the logging system
///
/// `RUST_LOG` overrides the level passed here.
pub fn init_logging(log_level: &str) -> Result<()> {
    let level = parse_log_level(log_level)?;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fieldcase={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| ExportError::ConfigParse(format!("failed to initialize logging: {e}")))?;

    Ok(())
}

fn parse_log_level(log_level: &str) -> Result<&str> {
    let normalized = log_level.to_lowercase();
    VALID_LEVELS
        .iter()
        .find(|&&level| level == normalized)
        .copied()
        .ok_or_else(|| {
            ExportError::ConfigParse(format!(
                "invalid log level '{log_level}', expected one of {VALID_LEVELS:?}"
            ))
        })
}
