//! End-to-end batch export tests over a real on-disk archive.

use fieldcase::archive::{self, DirectoryPolicy};
use fieldcase::config::ExportConfiguration;
use fieldcase::convert::CsvConverter;
use fieldcase::domain::{ExportError, FormId};
use fieldcase::export::{BatchCoordinator, ExportJobRunner, JobOutcome};
use fieldcase::prefs::{self, MemoryPreferences, PreferenceStore};
use fieldcase::registry::FormRegistry;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::path::Path;
use std::sync::Arc;

fn id(s: &str) -> FormId {
    FormId::new(s).unwrap()
}

fn add_form(storage: &Path, form_id: &str, encrypted: bool) {
    let form_dir = storage.join("forms").join(form_id);
    std::fs::create_dir_all(form_dir.join("submissions")).unwrap();
    std::fs::write(
        form_dir.join("form.json"),
        format!(r#"{{"id": "{form_id}", "name": "{form_id}", "file_encrypted": {encrypted}}}"#),
    )
    .unwrap();
}

fn add_submission(storage: &Path, form_id: &str, instance: &str, date: &str) {
    let path = storage
        .join("forms")
        .join(form_id)
        .join("submissions")
        .join(format!("{instance}.json"));
    std::fs::write(
        path,
        format!(
            r#"{{"instance_id": "{instance}", "submission_date": "{date}", "fields": {{"q1": "answer-{instance}"}}}}"#
        ),
    )
    .unwrap();
}

fn add_encrypted_submission(storage: &Path, form_id: &str, instance: &str, date: &str) {
    let path = storage
        .join("forms")
        .join(form_id)
        .join("submissions")
        .join(format!("{instance}.json"));
    std::fs::write(
        path,
        format!(
            r#"{{"instance_id": "{instance}", "submission_date": "{date}", "envelope": {{"encrypted_key": "AA==", "nonce": "AA==", "encrypted_fields": "AA=="}}}}"#
        ),
    )
    .unwrap();
}

/// Writes a PEM file holding only a public key, so credential resolution
/// must fail with NoPrivateKey.
fn write_public_only_pem(path: &Path) {
    let mut rng = rand::thread_rng();
    let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
    let pem = RsaPublicKey::from(&key)
        .to_public_key_pem(LineEnding::LF)
        .unwrap();
    std::fs::write(path, pem).unwrap();
}

fn configure(
    registry: &FormRegistry,
    form_id: &FormId,
    export_dir: &Path,
    pem_file: Option<&Path>,
) {
    registry
        .set_configuration(
            form_id,
            ExportConfiguration {
                export_dir: Some(export_dir.to_path_buf()),
                pem_file: pem_file.map(|p| p.to_path_buf()),
                ..Default::default()
            },
        )
        .unwrap();
}

#[tokio::test]
async fn batch_exports_all_valid_forms_and_records_failures() {
    let storage = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    add_form(storage.path(), "form_a", false);
    add_submission(storage.path(), "form_a", "a1", "2024-01-10T09:00:00Z");
    add_submission(storage.path(), "form_a", "a2", "2024-02-10T09:00:00Z");

    // form_b is encrypted but its PEM file holds no private key.
    add_form(storage.path(), "form_b", true);
    add_encrypted_submission(storage.path(), "form_b", "b1", "2024-01-15T09:00:00Z");
    let pem_path = storage.path().join("form_b_public.pem");
    write_public_only_pem(&pem_path);

    add_form(storage.path(), "form_c", false);
    add_submission(storage.path(), "form_c", "c1", "2024-03-01T09:00:00Z");

    let store: Arc<MemoryPreferences> = Arc::new(MemoryPreferences::new());
    let forms = archive::discover_forms(storage.path()).unwrap();
    let registry = Arc::new(FormRegistry::load(forms, store.as_ref()).unwrap());
    let policy = DirectoryPolicy::new(storage.path());

    configure(&registry, &id("form_a"), out.path(), None);
    configure(&registry, &id("form_b"), out.path(), Some(&pem_path));
    configure(&registry, &id("form_c"), out.path(), None);
    registry.select_all();

    let runner = Arc::new(ExportJobRunner::new(
        registry.clone(),
        Arc::new(CsvConverter::new(storage.path())),
        store.clone(),
    ));
    let summary = BatchCoordinator::new(runner)
        .with_parallelism(4)
        .export_selected(&registry, &policy)
        .await
        .unwrap();

    assert_eq!(summary.outcomes.len(), 3);
    assert!(!summary.is_successful());
    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.total_written(), 3);

    assert!(matches!(
        summary.outcome(&id("form_a")),
        Some(JobOutcome::Succeeded { .. })
    ));
    assert!(matches!(
        summary.outcome(&id("form_b")),
        Some(JobOutcome::Failed(ExportError::Credential(_)))
    ));
    assert!(matches!(
        summary.outcome(&id("form_c")),
        Some(JobOutcome::Succeeded { .. })
    ));

    // Output files exist only for the successful forms.
    assert!(out.path().join("form_a.csv").exists());
    assert!(!out.path().join("form_b.csv").exists());
    assert!(out.path().join("form_c.csv").exists());
    let csv_a = std::fs::read_to_string(out.path().join("form_a.csv")).unwrap();
    assert!(csv_a.contains("answer-a1"));
    assert!(csv_a.contains("answer-a2"));

    // Watermarks only for the successful forms, both in memory and in the
    // preference store.
    assert!(registry.last_export_time(&id("form_a")).is_some());
    assert!(registry.last_export_time(&id("form_b")).is_none());
    assert!(registry.last_export_time(&id("form_c")).is_some());
    assert!(store.get(&prefs::export_date_key(&id("form_a"))).is_some());
    assert!(store.get(&prefs::export_date_key(&id("form_b"))).is_none());
    assert!(store.get(&prefs::export_date_key(&id("form_c"))).is_some());

    // Failure is recorded on the form's status log.
    let form_b = registry.form(&id("form_b")).unwrap();
    assert!(!form_b.last_status().unwrap().success);
}

#[tokio::test]
async fn selected_form_without_valid_configuration_is_skipped() {
    let storage = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    add_form(storage.path(), "form_a", false);
    add_submission(storage.path(), "form_a", "a1", "2024-01-10T09:00:00Z");
    add_form(storage.path(), "form_b", false);
    add_submission(storage.path(), "form_b", "b1", "2024-01-10T09:00:00Z");

    let store: Arc<MemoryPreferences> = Arc::new(MemoryPreferences::new());
    let forms = archive::discover_forms(storage.path()).unwrap();
    let registry = Arc::new(FormRegistry::load(forms, store.as_ref()).unwrap());
    let policy = DirectoryPolicy::new(storage.path());

    // Only form_a gets a configuration; both are selected.
    configure(&registry, &id("form_a"), out.path(), None);
    registry.select_all();

    let runner = Arc::new(ExportJobRunner::new(
        registry.clone(),
        Arc::new(CsvConverter::new(storage.path())),
        store.clone(),
    ));
    let summary = BatchCoordinator::new(runner)
        .export_selected(&registry, &policy)
        .await
        .unwrap();

    assert_eq!(summary.outcomes.len(), 1);
    assert!(summary.is_successful());
    assert!(summary.outcome(&id("form_a")).is_some());
    assert!(summary.outcome(&id("form_b")).is_none());
    assert!(!out.path().join("form_b.csv").exists());
}

#[tokio::test]
async fn export_date_watermark_survives_registry_reload() {
    let storage = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    add_form(storage.path(), "form_a", false);
    add_submission(storage.path(), "form_a", "a1", "2024-01-10T09:00:00Z");

    let store: Arc<MemoryPreferences> = Arc::new(MemoryPreferences::new());
    let forms = archive::discover_forms(storage.path()).unwrap();
    let registry = Arc::new(FormRegistry::load(forms, store.as_ref()).unwrap());
    configure(&registry, &id("form_a"), out.path(), None);
    registry.select_all();

    let runner = Arc::new(ExportJobRunner::new(
        registry.clone(),
        Arc::new(CsvConverter::new(storage.path())),
        store.clone(),
    ));
    let summary = BatchCoordinator::new(runner)
        .export_selected(&registry, &DirectoryPolicy::new(storage.path()))
        .await
        .unwrap();
    assert!(summary.is_successful());
    let stamped = registry.last_export_time(&id("form_a")).unwrap();

    // A fresh registry over the same store sees the watermark.
    let forms = archive::discover_forms(storage.path()).unwrap();
    let reloaded = FormRegistry::load(forms, store.as_ref()).unwrap();
    let restored = reloaded.last_export_time(&id("form_a")).unwrap();
    assert_eq!(restored.timestamp(), stamped.timestamp());
}
