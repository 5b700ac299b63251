//! Integration tests for export configuration persistence through the
//! preference store implementations.

use chrono::NaiveDate;
use fieldcase::config::ExportConfiguration;
use fieldcase::domain::{ExportError, FormId};
use fieldcase::prefs::{self, JsonFilePreferences, MemoryPreferences, PreferenceStore};
use std::path::PathBuf;

fn full_configuration() -> ExportConfiguration {
    ExportConfiguration {
        export_dir: Some(PathBuf::from("/data/out")),
        pem_file: Some(PathBuf::from("/keys/form.pem")),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        end_date: NaiveDate::from_ymd_opt(2024, 6, 30),
        pull_before: true,
        pull_before_overrides_default: true,
    }
}

#[test]
fn round_trip_through_memory_store() {
    let store = MemoryPreferences::new();
    let prefix = prefs::configuration_prefix(&FormId::new("survey_v1").unwrap());

    full_configuration().save(&store, &prefix).unwrap();
    let loaded = ExportConfiguration::load(&store, &prefix).unwrap();
    assert_eq!(loaded, full_configuration());
}

#[test]
fn round_trip_survives_file_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    let prefix = prefs::configuration_prefix(&FormId::new("survey_v1").unwrap());

    {
        let store = JsonFilePreferences::open(&path).unwrap();
        full_configuration().save(&store, &prefix).unwrap();
    }

    let reopened = JsonFilePreferences::open(&path).unwrap();
    let loaded = ExportConfiguration::load(&reopened, &prefix).unwrap();
    assert_eq!(loaded, full_configuration());
}

#[test]
fn saving_partial_configuration_clears_stale_keys() {
    let store = MemoryPreferences::new();
    let prefix = prefs::configuration_prefix(&FormId::new("survey_v1").unwrap());

    full_configuration().save(&store, &prefix).unwrap();

    let partial = ExportConfiguration {
        export_dir: Some(PathBuf::from("/data/elsewhere")),
        ..Default::default()
    };
    partial.save(&store, &prefix).unwrap();

    let loaded = ExportConfiguration::load(&store, &prefix).unwrap();
    assert_eq!(loaded, partial);
    assert!(store.get(&format!("{prefix}pem_file")).is_none());
    assert!(store.get(&format!("{prefix}start_date")).is_none());
}

#[test]
fn configurations_of_different_forms_do_not_collide() {
    let store = MemoryPreferences::new();
    let prefix_a = prefs::configuration_prefix(&FormId::new("form_a").unwrap());
    let prefix_b = prefs::configuration_prefix(&FormId::new("form_b").unwrap());

    full_configuration().save(&store, &prefix_a).unwrap();
    ExportConfiguration::default()
        .save(&store, &prefix_b)
        .unwrap();

    assert_eq!(
        ExportConfiguration::load(&store, &prefix_a).unwrap(),
        full_configuration()
    );
    assert!(ExportConfiguration::load(&store, &prefix_b)
        .unwrap()
        .is_empty());
}

#[test]
fn malformed_stored_date_fails_load() {
    let store = MemoryPreferences::new();
    let prefix = prefs::configuration_prefix(&FormId::new("survey_v1").unwrap());
    store
        .put(&format!("{prefix}start_date"), "January 1st")
        .unwrap();

    assert!(matches!(
        ExportConfiguration::load(&store, &prefix),
        Err(ExportError::ConfigParse(_))
    ));
}

#[test]
fn malformed_preference_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    std::fs::write(&path, "not json at all").unwrap();

    assert!(matches!(
        JsonFilePreferences::open(&path),
        Err(ExportError::Preferences(_))
    ));
}
