//! # yafv
//!
//! A schema-driven structural validator for HL7 FHIR resources (R4, R4B, R5).
//!
//! The validator walks an arbitrary JSON resource tree, cross-references it
//! against a catalog of per-type schema metadata (property lists,
//! cardinalities, accepted types, choice-type groups) and reports every
//! problem it finds as an issue of a FHIR `OperationOutcome`.
//!
//! ## Features
//!
//! - **Declarative catalogs**: schemas are JSON/YAML tables, embedded per FHIR
//!   version or loaded from a directory
//! - **Choice types**: `value[x]` exclusivity and allowed type suffixes
//! - **Primitive extensions**: `_<name>` companions validated as `Element`
//! - **Actionable diagnostics**: expected types, parent context and a
//!   FHIRPath-like `expression` on every issue
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use yafv::{FhirValidator, FhirVersion};
//! use serde_json::json;
//!
//! # fn example() -> yafv::Result<()> {
//! let validator = FhirValidator::for_version(FhirVersion::R4)?;
//! let outcome = validator.validate(&json!({
//!     "resourceType": "Patient",
//!     "active": "not-a-boolean"
//! }))?;
//!
//! for issue in &outcome.issue {
//!     println!("{issue}");
//! }
//! assert!(!outcome.is_valid());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod embedded;
pub mod error;
pub mod path;
pub mod validation;

pub use catalog::{SchemaCatalog, SchemaEntry, TypeKind, TypeSchema};
pub use config::{FhirVersion, ValidatorConfig};
pub use error::{Result, YafvError};
pub use path::{ElementPath, PathSegment};
pub use validation::{
    FhirValidator, Issue, IssueCode, IssueSeverity, OperationOutcome, ValidationOptions,
};
