use serde_json::Value;
use std::path::PathBuf;
use yafv::validation::ISSUE_TYPE_SYSTEM;
use yafv::*;

#[allow(dead_code)]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[allow(dead_code)]
pub fn load_fixture(name: &str) -> Value {
    let content = std::fs::read_to_string(fixture_path(name)).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[allow(dead_code)]
pub fn r4_validator() -> FhirValidator {
    FhirValidator::for_version(FhirVersion::R4).unwrap()
}

#[allow(dead_code)]
pub fn validate(resource: &Value) -> OperationOutcome {
    r4_validator().validate(resource).unwrap()
}

#[allow(dead_code)]
pub fn issues_with_code(outcome: &OperationOutcome, code: IssueCode) -> Vec<&Issue> {
    outcome.issue.iter().filter(|issue| issue.code == code).collect()
}

/// Finds the issue whose first expression is exactly `expression`.
#[allow(dead_code)]
pub fn issue_at<'a>(outcome: &'a OperationOutcome, expression: &str) -> Option<&'a Issue> {
    outcome
        .issue
        .iter()
        .find(|issue| issue.expression.first().map(String::as_str) == Some(expression))
}

/// Every error must carry diagnostics and a details block coded against the
/// FHIR issue-type system.
#[allow(dead_code)]
pub fn assert_issue_contract(outcome: &OperationOutcome) {
    assert_eq!(outcome.resource_type, "OperationOutcome");
    for issue in outcome.errors() {
        assert!(
            !issue.diagnostics().trim().is_empty(),
            "empty diagnostics: {issue:?}"
        );
        let details = issue.details.as_ref().expect("details must be populated");
        assert!(!details.text.trim().is_empty(), "empty details text: {issue:?}");
        assert_eq!(details.coding[0].system, ISSUE_TYPE_SYSTEM);
        assert_eq!(details.coding[0].code, issue.code.as_str());
    }
}

/// Takes a nested JSON value apart level by level; dropping it whole would
/// recurse once per nesting level.
#[allow(dead_code)]
pub fn dismantle(value: Value) {
    let mut pending = vec![value];
    while let Some(mut value) = pending.pop() {
        match &mut value {
            Value::Array(items) => pending.append(items),
            Value::Object(object) => {
                pending.extend(std::mem::take(object).into_iter().map(|(_, item)| item))
            }
            _ => {}
        }
    }
}
