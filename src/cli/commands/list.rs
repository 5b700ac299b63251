//! List command implementation
//!
//! Lists the forms found in the archive together with their encryption
//! flag and whether a valid export configuration is stored for them.

use crate::archive::{self, DirectoryPolicy};
use crate::prefs::JsonFilePreferences;
use crate::registry::FormRegistry;
use clap::Args;
use std::path::{Path, PathBuf};

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Archive storage directory
    #[arg(long)]
    pub storage_dir: PathBuf,
}

impl ListArgs {
    /// Execute the list command
    pub fn execute(&self, prefs_path: &Path) -> anyhow::Result<i32> {
        let store = JsonFilePreferences::open(prefs_path)?;
        let forms = archive::discover_forms(&self.storage_dir)?;
        let registry = FormRegistry::load(forms, &store)?;
        let policy = DirectoryPolicy::new(&self.storage_dir);

        if registry.is_empty() {
            println!("No forms found in {}", self.storage_dir.display());
            return Ok(0);
        }

        println!(
            "{:<30} {:<30} {:<10} {:<12}",
            "FORM ID", "NAME", "ENCRYPTED", "CONFIGURED"
        );
        for form in registry.forms() {
            let configured = registry.has_valid_configuration(&form.id, &policy);
            println!(
                "{:<30} {:<30} {:<10} {:<12}",
                form.id,
                form.name,
                if form.is_encrypted() { "yes" } else { "no" },
                if configured { "yes" } else { "no" }
            );
        }
        println!("\n{} form(s)", registry.len());
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_args_parse() {
        let args = ListArgs {
            storage_dir: PathBuf::from("/data/archive"),
        };
        assert_eq!(args.storage_dir, PathBuf::from("/data/archive"));
    }
}
