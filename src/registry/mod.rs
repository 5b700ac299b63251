//! Form registry
//!
//! The [`FormRegistry`] owns everything the export engine knows about the
//! archive's forms: the ordered form list (insertion order is display
//! order), the per-form [`ExportConfiguration`] map, the last-successful-
//! export watermark map, and a rebuildable reverse index from form
//! identifier to list position.
//!
//! The registry is keyed by form identifier throughout. The reverse index
//! is a derived cache: it is recomputed wholesale after every structural
//! change to the form list rather than patched incrementally, so it can
//! never diverge from the list.
//!
//! All mutable state sits behind one internal mutex. Jobs running in
//! parallel share the registry through an `Arc` and only ever see complete
//! writes; callers outside the registry receive cloned snapshots of forms
//! and configurations.

use crate::archive::DirectoryPolicy;
use crate::config::ExportConfiguration;
use crate::domain::{ExportError, Form, FormId, Result, StatusEntry};
use crate::prefs::{self, PreferenceStore};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Observer invoked after every successful export outcome
pub type SuccessCallback = Box<dyn Fn(&FormId, DateTime<Utc>) + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    forms: Vec<Form>,
    configurations: HashMap<FormId, ExportConfiguration>,
    last_exports: HashMap<FormId, DateTime<Utc>>,
    index: HashMap<FormId, usize>,
}

impl RegistryInner {
    fn rebuild_index(&mut self) {
        self.index = self
            .forms
            .iter()
            .enumerate()
            .map(|(pos, form)| (form.id.clone(), pos))
            .collect();
    }

    fn position(&self, form_id: &FormId) -> Result<usize> {
        self.index
            .get(form_id)
            .copied()
            .ok_or_else(|| ExportError::FormNotFound(form_id.clone()))
    }
}

/// Registry of forms and their export state
pub struct FormRegistry {
    inner: Mutex<RegistryInner>,
    on_success: Mutex<Vec<SuccessCallback>>,
}

impl FormRegistry {
    /// Build a registry from a snapshot of discovered forms plus restored
    /// configurations and watermarks
    ///
    /// Map entries whose identifier is not in the form list are dropped, so
    /// the registry invariant (every mapped identifier is listed and
    /// indexed) holds from construction onward.
    pub fn new(
        forms: Vec<Form>,
        configurations: HashMap<FormId, ExportConfiguration>,
        last_exports: HashMap<FormId, DateTime<Utc>>,
    ) -> Self {
        let mut inner = RegistryInner {
            forms,
            configurations,
            last_exports,
            index: HashMap::new(),
        };
        inner.rebuild_index();
        inner
            .configurations
            .retain(|id, _| inner.index.contains_key(id));
        inner
            .last_exports
            .retain(|id, _| inner.index.contains_key(id));
        Self {
            inner: Mutex::new(inner),
            on_success: Mutex::new(Vec::new()),
        }
    }

    /// Build a registry from discovered forms, restoring each form's
    /// configuration and watermark from the preference store
    ///
    /// A malformed stored date fails the whole load with
    /// [`ExportError::ConfigParse`].
    pub fn load(forms: Vec<Form>, store: &dyn PreferenceStore) -> Result<Self> {
        let mut configurations = HashMap::new();
        let mut last_exports = HashMap::new();

        for form in &forms {
            let config =
                ExportConfiguration::load(store, &prefs::configuration_prefix(&form.id))?;
            configurations.insert(form.id.clone(), config);

            if let Some(raw) = store.get(&prefs::export_date_key(&form.id)) {
                let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|e| {
                    ExportError::ConfigParse(format!(
                        "malformed export date '{raw}' for form {}: {e}",
                        form.id
                    ))
                })?;
                last_exports.insert(form.id.clone(), parsed.with_timezone(&Utc));
            }
        }

        Ok(Self::new(forms, configurations, last_exports))
    }

    /// Number of registered forms
    pub fn len(&self) -> usize {
        self.lock().forms.len()
    }

    /// Whether the registry holds no forms
    pub fn is_empty(&self) -> bool {
        self.lock().forms.is_empty()
    }

    /// Snapshot of all forms in display order
    pub fn forms(&self) -> Vec<Form> {
        self.lock().forms.clone()
    }

    /// Snapshot of one form by identifier
    pub fn form(&self, form_id: &FormId) -> Option<Form> {
        let inner = self.lock();
        inner
            .index
            .get(form_id)
            .map(|&pos| inner.forms[pos].clone())
    }

    /// Append newly discovered forms
    ///
    /// Forms whose identifier is already indexed are ignored; new forms are
    /// appended in the order given, never disturbing existing order. The
    /// reverse index is rebuilt afterward.
    pub fn merge(&self, new_forms: Vec<Form>) {
        let mut inner = self.lock();
        for form in new_forms {
            if !inner.index.contains_key(&form.id) {
                // Index the form immediately so duplicates within one merge
                // batch are also dropped.
                let pos = inner.forms.len();
                inner.index.insert(form.id.clone(), pos);
                inner.forms.push(form);
            }
        }
        inner.rebuild_index();
    }

    /// Stored configuration for a form, lazily creating an empty one
    ///
    /// The first read for a form without prior settings stores and returns
    /// an empty configuration, so a subsequent [`Self::has_configuration`]
    /// is true.
    pub fn get_configuration(&self, form_id: &FormId) -> Result<ExportConfiguration> {
        let mut inner = self.lock();
        inner.position(form_id)?;
        Ok(inner
            .configurations
            .entry(form_id.clone())
            .or_default()
            .clone())
    }

    /// Whether a configuration entry exists for the form
    pub fn has_configuration(&self, form_id: &FormId) -> bool {
        self.lock().configurations.contains_key(form_id)
    }

    /// Wholesale-replace a form's configuration
    pub fn set_configuration(&self, form_id: &FormId, config: ExportConfiguration) -> Result<()> {
        let mut inner = self.lock();
        inner.position(form_id)?;
        inner.configurations.insert(form_id.clone(), config);
        Ok(())
    }

    /// Delete a form's configuration entry
    ///
    /// A subsequent [`Self::get_configuration`] returns a fresh empty one.
    pub fn remove_configuration(&self, form_id: &FormId) -> Result<()> {
        let mut inner = self.lock();
        inner.position(form_id)?;
        inner.configurations.remove(form_id);
        Ok(())
    }

    /// Whether the form has a stored, non-empty, valid configuration
    pub fn has_valid_configuration(&self, form_id: &FormId, policy: &DirectoryPolicy) -> bool {
        let inner = self.lock();
        let Some(&pos) = inner.index.get(form_id) else {
            return false;
        };
        let encrypted = inner.forms[pos].is_encrypted();
        inner
            .configurations
            .get(form_id)
            .is_some_and(|config| !config.is_empty() && config.is_valid(policy, encrypted))
    }

    /// Configurations of all forms that are actually exportable
    ///
    /// Filtered to stored, non-empty, valid entries. The batch coordinator
    /// uses this to decide which selected forms can run.
    pub fn valid_configurations(
        &self,
        policy: &DirectoryPolicy,
    ) -> HashMap<FormId, ExportConfiguration> {
        let inner = self.lock();
        inner
            .forms
            .iter()
            .filter_map(|form| {
                let config = inner.configurations.get(&form.id)?;
                if !config.is_empty() && config.is_valid(policy, form.is_encrypted()) {
                    Some((form.id.clone(), config.clone()))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Mark one form as selected or unselected
    pub fn set_selected(&self, form_id: &FormId, selected: bool) -> Result<()> {
        let mut inner = self.lock();
        let pos = inner.position(form_id)?;
        inner.forms[pos].selected = selected;
        Ok(())
    }

    /// Select every form
    pub fn select_all(&self) {
        for form in &mut self.lock().forms {
            form.selected = true;
        }
    }

    /// Unselect every form
    pub fn clear_all(&self) {
        for form in &mut self.lock().forms {
            form.selected = false;
        }
    }

    /// Snapshot of the selected forms in display order
    pub fn selected_forms(&self) -> Vec<Form> {
        self.lock()
            .forms
            .iter()
            .filter(|form| form.selected)
            .cloned()
            .collect()
    }

    /// Whether at least one form is selected
    pub fn some_selected(&self) -> bool {
        self.lock().forms.iter().any(|form| form.selected)
    }

    /// Whether every form is selected
    pub fn all_selected(&self) -> bool {
        self.lock().forms.iter().all(|form| form.selected)
    }

    /// Whether no form is selected
    pub fn none_selected(&self) -> bool {
        !self.some_selected()
    }

    /// Whether every selected form has a stored, non-empty, valid
    /// configuration
    pub fn all_selected_have_valid_configuration(&self, policy: &DirectoryPolicy) -> bool {
        let selected: Vec<FormId> = self
            .lock()
            .forms
            .iter()
            .filter(|form| form.selected)
            .map(|form| form.id.clone())
            .collect();
        selected
            .iter()
            .all(|id| self.has_valid_configuration(id, policy))
    }

    /// Record one export outcome on a form's status log
    ///
    /// Appends the status entry; when `succeeded`, also stamps the current
    /// time as the form's last-export watermark and invokes every registered
    /// success callback with the form identifier and that timestamp.
    ///
    /// Returns the stamped timestamp on success, `None` on a recorded
    /// failure. An unknown identifier is a programming error and returns
    /// [`ExportError::FormNotFound`] without touching any state.
    pub fn record_outcome(
        &self,
        form_id: &FormId,
        message: &str,
        succeeded: bool,
    ) -> Result<Option<DateTime<Utc>>> {
        let stamped = {
            let mut inner = self.lock();
            let pos = inner.position(form_id)?;
            inner.forms[pos]
                .status_log
                .push(StatusEntry::new(message, succeeded));
            if succeeded {
                let now = Utc::now();
                inner.last_exports.insert(form_id.clone(), now);
                Some(now)
            } else {
                None
            }
        };

        // Callbacks run outside the registry lock so subscribers may read
        // the registry without deadlocking.
        if let Some(timestamp) = stamped {
            for callback in self.on_success.lock().expect("callback lock poisoned").iter() {
                callback(form_id, timestamp);
            }
        }

        Ok(stamped)
    }

    /// Last successful export time of a form, if any
    pub fn last_export_time(&self, form_id: &FormId) -> Option<DateTime<Utc>> {
        self.lock().last_exports.get(form_id).copied()
    }

    /// Register an observer invoked synchronously inside
    /// [`Self::record_outcome`] after every successful export
    pub fn on_successful_export(&self, callback: SuccessCallback) {
        self.on_success
            .lock()
            .expect("callback lock poisoned")
            .push(callback);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        self.inner.lock().expect("registry lock poisoned")
    }
}
