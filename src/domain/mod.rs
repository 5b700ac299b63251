//! Domain models and types for Fieldcase.
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`FormId`])
//! - **Domain models** ([`Form`], [`StatusEntry`])
//! - **Error types** ([`ExportError`], [`CredentialError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Fieldcase uses the newtype pattern for identifiers so form identifiers
//! cannot be mixed with arbitrary strings:
//!
//! ```rust
//! use fieldcase::domain::FormId;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let form_id = FormId::new("household_survey_v3")?;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod form;
pub mod ids;

pub use errors::{CredentialError, ExportError, Result};
pub use form::{Form, StatusEntry};
pub use ids::FormId;
