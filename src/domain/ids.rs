//! Domain identifier types with validation
//!
//! Newtype wrappers for form identifiers. Each type ensures type safety and
//! validates that the identifier is non-empty.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Form identifier newtype wrapper
///
/// Represents the stable identifier of one data-collection form. Form
/// identifiers come from the form definition in the local archive and are
/// the key for configurations and last-export watermarks.
///
/// # Examples
///
/// ```
/// use fieldcase::domain::FormId;
/// use std::str::FromStr;
///
/// let form_id = FormId::from_str("household_survey_v3").unwrap();
/// assert_eq!(form_id.as_str(), "household_survey_v3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormId(String);

impl FormId {
    /// Creates a new FormId from a string
    ///
    /// # Arguments
    ///
    /// * `id` - The form identifier string
    ///
    /// # Returns
    ///
    /// Returns `Ok(FormId)` if the ID is non-empty, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Form ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the form ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FormId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for FormId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
