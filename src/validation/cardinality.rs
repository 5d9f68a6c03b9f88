//! Presence and shape checks for a single schema entry.

use crate::catalog::SchemaEntry;
use crate::path::ElementPath;
use crate::validation::outcome::{DiagnosticsBuilder, Issue};
use crate::validation::primitive::JsonKind;
use serde_json::Value;

/// Outcome of checking one property value against its entry's cardinality.
#[derive(Debug, Clone, PartialEq)]
pub enum CardinalityResult<'v> {
    /// Optional and absent; nothing further to check
    Absent,
    /// A single value to type-check
    Scalar(&'v Value),
    /// Items to type-check one by one, plus an issue when there are more than `max`
    Array {
        items: &'v [Value],
        overflow: Option<Issue>,
    },
    /// The value cannot be checked any further
    Violation(Issue),
}

/// JSON `null` counts as absent.
pub fn is_absent(value: Option<&Value>) -> bool {
    value.is_none_or(Value::is_null)
}

pub struct CardinalityChecker;

impl CardinalityChecker {
    /// Checks `value` (the property as found on its parent object) against `entry`.
    pub fn check<'v>(value: Option<&'v Value>, entry: &SchemaEntry, path: &ElementPath) -> CardinalityResult<'v> {
        let value = match value {
            Some(value) if !value.is_null() => value,
            _ if entry.is_required() => {
                return CardinalityResult::Violation(DiagnosticsBuilder::missing_required(path));
            }
            _ => return CardinalityResult::Absent,
        };

        match (entry.is_array(), value) {
            (true, Value::Array(items)) => {
                if items.is_empty() {
                    return CardinalityResult::Violation(DiagnosticsBuilder::empty_array(
                        path,
                        entry.is_required(),
                    ));
                }
                let overflow = entry
                    .max
                    .filter(|max| items.len() > *max as usize)
                    .map(|max| DiagnosticsBuilder::too_many_items(path, max, items.len()));
                CardinalityResult::Array { items, overflow }
            }
            (true, other) => CardinalityResult::Violation(DiagnosticsBuilder::array_expected(
                path,
                JsonKind::of(other),
            )),
            (false, Value::Array(_)) => {
                CardinalityResult::Violation(DiagnosticsBuilder::scalar_expected(path))
            }
            (false, other) => CardinalityResult::Scalar(other),
        }
    }

    /// A `null` array item is only a placeholder when the `_<name>` companion
    /// array carries the extension data for the same index.
    pub fn null_item_allowed(companion: Option<&Value>, index: usize) -> bool {
        companion
            .and_then(Value::as_array)
            .and_then(|items| items.get(index))
            .is_some_and(|item| !item.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Shape;
    use crate::validation::outcome::IssueCode;
    use serde_json::json;

    fn entry(name: &str, min: u32, shape: Shape, max: Option<u32>) -> SchemaEntry {
        SchemaEntry {
            name: name.to_string(),
            min,
            max,
            shape,
            expected_types: vec!["HumanName".to_string()],
            choice_group: None,
        }
    }

    fn path(name: &str) -> ElementPath {
        ElementPath::root("Patient").field(name)
    }

    fn violation(result: CardinalityResult<'_>) -> Issue {
        match result {
            CardinalityResult::Violation(issue) => issue,
            other => panic!("expected a violation, got {other:?}"),
        }
    }

    #[test]
    fn test_required_absent_and_null() {
        let status = entry("status", 1, Shape::Scalar, None);

        let issue = violation(CardinalityChecker::check(None, &status, &path("status")));
        assert_eq!(issue.code, IssueCode::Required);
        assert_eq!(issue.expression, vec!["Patient.status"]);

        let null = json!(null);
        let issue = violation(CardinalityChecker::check(Some(&null), &status, &path("status")));
        assert_eq!(issue.code, IssueCode::Required);
    }

    #[test]
    fn test_optional_absent_is_skipped() {
        let name = entry("name", 0, Shape::Array, None);
        assert_eq!(
            CardinalityChecker::check(None, &name, &path("name")),
            CardinalityResult::Absent
        );
        assert!(is_absent(Some(&json!(null))));
        assert!(!is_absent(Some(&json!(false))));
    }

    #[test]
    fn test_array_expected_but_object_given() {
        let name = entry("name", 0, Shape::Array, None);
        let value = json!({"family": "Smith"});

        let issue = violation(CardinalityChecker::check(Some(&value), &name, &path("name")));
        assert_eq!(issue.code, IssueCode::Structure);
        assert!(issue.diagnostics().contains("array field"));
        assert!(issue.diagnostics().contains("scalar value"));
    }

    #[test]
    fn test_scalar_expected_but_array_given() {
        let gender = entry("gender", 0, Shape::Scalar, None);
        let value = json!(["male"]);

        let issue = violation(CardinalityChecker::check(Some(&value), &gender, &path("gender")));
        assert_eq!(issue.code, IssueCode::Structure);
        assert!(issue.diagnostics().contains("scalar field"));
    }

    #[test]
    fn test_empty_arrays() {
        let value = json!([]);

        let optional = entry("name", 0, Shape::Array, None);
        let issue = violation(CardinalityChecker::check(Some(&value), &optional, &path("name")));
        assert_eq!(issue.code, IssueCode::Structure);

        let required = entry("name", 1, Shape::Array, None);
        let issue = violation(CardinalityChecker::check(Some(&value), &required, &path("name")));
        assert_eq!(issue.code, IssueCode::Required);
    }

    #[test]
    fn test_array_max() {
        let bounded = entry("name", 0, Shape::Array, Some(1));
        let value = json!([{"family": "A"}, {"family": "B"}]);

        match CardinalityChecker::check(Some(&value), &bounded, &path("name")) {
            CardinalityResult::Array { items, overflow } => {
                assert_eq!(items.len(), 2);
                let issue = overflow.unwrap();
                assert_eq!(issue.code, IssueCode::Structure);
                assert!(issue.diagnostics().contains("at most 1"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_null_item_allowed() {
        let companion = json!([null, {"id": "x"}]);
        assert!(!CardinalityChecker::null_item_allowed(Some(&companion), 0));
        assert!(CardinalityChecker::null_item_allowed(Some(&companion), 1));
        assert!(!CardinalityChecker::null_item_allowed(Some(&companion), 2));
        assert!(!CardinalityChecker::null_item_allowed(None, 0));
    }
}
