//! OperationOutcome-shaped validation results.
//!
//! Every issue produced by the validator goes through [`DiagnosticsBuilder`],
//! which guarantees a non-empty `diagnostics` text, a `details` block coded
//! against the FHIR issue-type system and, when a location is known, an
//! `expression` entry.

use crate::path::ElementPath;
use crate::validation::primitive::{JsonKind, TypeMismatch};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Code system of `OperationOutcome.issue.code`.
pub const ISSUE_TYPE_SYSTEM: &str = "http://hl7.org/fhir/issue-type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
}

impl IssueSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueSeverity::Fatal => "fatal",
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
            IssueSeverity::Information => "information",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, IssueSeverity::Fatal | IssueSeverity::Error)
    }
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue kinds, serialized as codes of `http://hl7.org/fhir/issue-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCode {
    /// A mandatory property is absent
    Required,
    /// A present value has the wrong type or format
    Value,
    /// Container shape mismatch, conflicting choice members or unknown properties
    Structure,
    /// Malformed input at the top level or a disallowed choice type
    Invalid,
    /// Input nested deeper than the configured limit
    TooCostly,
    Informational,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::Required => "required",
            IssueCode::Value => "value",
            IssueCode::Structure => "structure",
            IssueCode::Invalid => "invalid",
            IssueCode::TooCostly => "too-costly",
            IssueCode::Informational => "informational",
        }
    }

    /// Severity implied by the code.
    pub fn default_severity(&self) -> IssueSeverity {
        match self {
            IssueCode::Informational => IssueSeverity::Information,
            _ => IssueSeverity::Error,
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coding {
    pub system: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDetails {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,
}

/// One `OperationOutcome.issue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub code: IssueCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expression: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<IssueDetails>,
}

impl Issue {
    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }

    pub fn diagnostics(&self) -> &str {
        self.diagnostics.as_deref().unwrap_or_default()
    }

    /// Replaces the severity implied by the code.
    pub fn with_severity(mut self, severity: IssueSeverity) -> Self {
        self.severity = severity;
        self
    }

}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.diagnostics())?;
        if !self.expression.is_empty() {
            write!(f, " @ {}", self.expression.join(", "))?;
        }
        Ok(())
    }
}

/// Aggregate result of one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    #[serde(default)]
    pub issue: Vec<Issue>,
}

impl Default for OperationOutcome {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl OperationOutcome {
    pub fn new(issue: Vec<Issue>) -> Self {
        Self {
            resource_type: "OperationOutcome".to_string(),
            issue,
        }
    }

    /// True when no issue has error or fatal severity.
    pub fn is_valid(&self) -> bool {
        !self.issue.iter().any(Issue::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issue.iter().filter(|i| i.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.issue
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
            .count()
    }

    pub fn info_count(&self) -> usize {
        self.issue
            .iter()
            .filter(|i| i.severity == IssueSeverity::Information)
            .count()
    }

    pub fn merge(&mut self, other: OperationOutcome) {
        self.issue.extend(other.issue);
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self)
    }
}

/// Builds fully populated issues and the wording shared by all checkers.
pub struct DiagnosticsBuilder;

impl DiagnosticsBuilder {
    /// Core constructor: severity from `code`, diagnostics mirrored into
    /// `details.text`, expression from `path`.
    pub fn build(code: IssueCode, path: Option<&ElementPath>, diagnostics: impl Into<String>) -> Issue {
        let mut diagnostics = diagnostics.into();
        if diagnostics.trim().is_empty() {
            diagnostics = format!("Validation failed ({code})");
        }
        let expression = path
            .filter(|p| !p.is_empty())
            .map(|p| vec![p.current_expression()])
            .unwrap_or_default();

        Issue {
            severity: code.default_severity(),
            code,
            details: Some(IssueDetails {
                text: diagnostics.clone(),
                coding: vec![Coding {
                    system: ISSUE_TYPE_SYSTEM.to_string(),
                    code: code.as_str().to_string(),
                }],
            }),
            diagnostics: Some(diagnostics),
            expression,
        }
    }

    /// Wrong primitive kind or format, or a non-object for a complex type.
    pub fn type_mismatch(path: &ElementPath, mismatch: &TypeMismatch) -> Issue {
        let found = match &mismatch.detail {
            Some(detail) => detail.clone(),
            None => format!("found {}", mismatch.found),
        };
        Self::build(
            IssueCode::Value,
            Some(path),
            format!(
                "Invalid value for {}: {found}. Expected type(s): {}",
                describe(path),
                mismatch.expected_list()
            ),
        )
    }

    pub fn missing_required(path: &ElementPath) -> Issue {
        Self::build(
            IssueCode::Required,
            Some(path),
            format!("Missing required property {}", describe(path)),
        )
    }

    pub fn missing_required_choice(path: &ElementPath, members: &[&str]) -> Issue {
        Self::build(
            IssueCode::Required,
            Some(path),
            format!(
                "Missing required choice {}: one of {} must be present",
                describe(path),
                members.join(", ")
            ),
        )
    }

    /// Schema says array, data holds a single value.
    pub fn array_expected(path: &ElementPath, found: JsonKind) -> Issue {
        Self::build(
            IssueCode::Structure,
            Some(path),
            format!(
                "Property {} is an array field but a scalar value ({found}) was supplied",
                describe(path)
            ),
        )
    }

    /// Schema says single value, data holds an array.
    pub fn scalar_expected(path: &ElementPath) -> Issue {
        Self::build(
            IssueCode::Structure,
            Some(path),
            format!(
                "Property {} is a scalar field but an array value was supplied",
                describe(path)
            ),
        )
    }

    pub fn empty_array(path: &ElementPath, required: bool) -> Issue {
        let code = if required {
            IssueCode::Required
        } else {
            IssueCode::Structure
        };
        Self::build(
            code,
            Some(path),
            format!("Array property {} must not be empty", describe(path)),
        )
    }

    pub fn too_many_items(path: &ElementPath, max: u32, found: usize) -> Issue {
        Self::build(
            IssueCode::Structure,
            Some(path),
            format!(
                "Array property {} allows at most {max} item(s), found {found}",
                describe(path)
            ),
        )
    }

    pub fn null_item(path: &ElementPath) -> Issue {
        Self::build(
            IssueCode::Structure,
            Some(path),
            format!(
                "Null entry in {} is only allowed when a matching primitive extension is present",
                describe(path)
            ),
        )
    }

    pub fn conflicting_choice(group_path: &ElementPath, members: &[(&str, ElementPath)]) -> Issue {
        let names: Vec<&str> = members.iter().map(|(name, _)| *name).collect();
        let mut issue = Self::build(
            IssueCode::Structure,
            None,
            format!(
                "Conflicting choice-type members for {}: {}; at most one may be present",
                describe(group_path),
                names.join(", ")
            ),
        );
        issue.expression = members
            .iter()
            .map(|(_, path)| path.current_expression())
            .collect();
        issue
    }

    pub fn invalid_choice_suffix(path: &ElementPath, group_name: &str, suffix: &str, allowed: &[&str]) -> Issue {
        Self::build(
            IssueCode::Invalid,
            Some(path),
            format!(
                "Type '{suffix}' is not allowed for choice '{group_name}'{}; allowed: {}",
                parent_context(path),
                allowed.join(", ")
            ),
        )
    }

    pub fn unknown_property(path: &ElementPath) -> Issue {
        Self::build(
            IssueCode::Structure,
            Some(path),
            format!("Unrecognized property {}", describe(path)),
        )
    }

    pub fn invalid_companion(path: &ElementPath, found: JsonKind, expected: &str) -> Issue {
        Self::build(
            IssueCode::Structure,
            Some(path),
            format!(
                "Primitive extension {} must be {expected}, found {found}",
                describe(path)
            ),
        )
    }

    /// `_<name>` array whose length differs from the primitive array it annotates.
    pub fn companion_length_mismatch(path: &ElementPath, values: usize, companions: usize) -> Issue {
        Self::build(
            IssueCode::Structure,
            Some(path),
            format!(
                "Primitive extension {} has {companions} item(s) but its value array has {values}; both arrays must have the same length",
                describe(path)
            ),
        )
    }

    pub fn depth_exceeded(path: &ElementPath, max_depth: usize) -> Issue {
        Self::build(
            IssueCode::TooCostly,
            Some(path),
            format!(
                "Element {} is nested deeper than {max_depth} levels and was not validated",
                describe(path)
            ),
        )
    }

    /// Top-level input problems: not an object, missing or unknown `resourceType`.
    pub fn invalid_input(path: Option<&ElementPath>, message: impl Into<String>) -> Issue {
        Self::build(IssueCode::Invalid, path, message)
    }
}

/// `'family' in 'name'`, or just `'Patient'` at the root.
fn describe(path: &ElementPath) -> String {
    match path.last_field() {
        Some(field) => format!("'{field}'{}", parent_context(path)),
        None => format!("'{path}'"),
    }
}

fn parent_context(path: &ElementPath) -> String {
    path.parent_segment()
        .map(|parent| format!(" in '{parent}'"))
        .unwrap_or_default()
}
