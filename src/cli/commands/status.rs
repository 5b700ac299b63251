//! Status command implementation
//!
//! Shows each form's last export watermark and its most recent status
//! message, restored from the preference file.

use crate::archive;
use crate::prefs::JsonFilePreferences;
use crate::registry::FormRegistry;
use clap::Args;
use std::path::{Path, PathBuf};

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Archive storage directory
    #[arg(long)]
    pub storage_dir: PathBuf,
}

impl StatusArgs {
    /// Execute the status command
    pub fn execute(&self, prefs_path: &Path) -> anyhow::Result<i32> {
        let store = JsonFilePreferences::open(prefs_path)?;
        let forms = archive::discover_forms(&self.storage_dir)?;
        let registry = FormRegistry::load(forms, &store)?;

        if registry.is_empty() {
            println!("No forms found in {}", self.storage_dir.display());
            return Ok(0);
        }

        println!("{:<30} {:<25} {}", "FORM ID", "LAST EXPORT", "LAST STATUS");
        for form in registry.forms() {
            let last_export = registry
                .last_export_time(&form.id)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string());
            let last_status = form
                .last_status()
                .map(|entry| entry.message.clone())
                .unwrap_or_else(|| "-".to_string());
            println!("{:<30} {:<25} {}", form.id, last_export, last_status);
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_args_parse() {
        let args = StatusArgs {
            storage_dir: PathBuf::from("/data/archive"),
        };
        assert_eq!(args.storage_dir, PathBuf::from("/data/archive"));
    }
}
