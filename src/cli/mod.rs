//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Fieldcase using clap.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fieldcase - bulk form-submission export tool
#[derive(Parser, Debug)]
#[command(name = "fieldcase")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the preference file holding per-form settings and watermarks
    #[arg(
        short,
        long,
        default_value = "fieldcase-prefs.json",
        env = "FIELDCASE_PREFS"
    )]
    pub prefs: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FIELDCASE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export form submissions from the archive to CSV
    Export(commands::export::ExportArgs),

    /// List the forms discovered in the archive
    List(commands::list::ListArgs),

    /// Show per-form export status and watermarks
    Status(commands::status::StatusArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_export() {
        let cli = Cli::parse_from([
            "fieldcase",
            "export",
            "--storage-dir",
            "/data/archive",
            "--form-id",
            "survey_v1",
        ]);
        assert_eq!(cli.prefs, PathBuf::from("fieldcase-prefs.json"));
        assert!(matches!(cli.command, Commands::Export(_)));
    }

    #[test]
    fn test_cli_parse_with_prefs() {
        let cli = Cli::parse_from([
            "fieldcase",
            "--prefs",
            "/tmp/prefs.json",
            "list",
            "--storage-dir",
            "/data/archive",
        ]);
        assert_eq!(cli.prefs, PathBuf::from("/tmp/prefs.json"));
        assert!(matches!(cli.command, Commands::List(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from([
            "fieldcase",
            "--log-level",
            "debug",
            "status",
            "--storage-dir",
            "/data/archive",
        ]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_export_requires_form_or_all() {
        let result = Cli::try_parse_from(["fieldcase", "export", "--storage-dir", "/data"]);
        assert!(result.is_err());
    }
}
