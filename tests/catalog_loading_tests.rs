use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use yafv::catalog::CatalogDocument;
use yafv::*;

const BASE_YAML: &str = r#"
fhirVersion: "4.0.1"
types:
  Element:
    kind: abstract
    properties:
      - name: id
        type: string
  Resource:
    kind: abstract
    properties:
      - name: id
        type: id
"#;

const DEVICE_JSON: &str = r#"{
    "types": {
        "Device": {
            "kind": "resource",
            "base": "Resource",
            "properties": [
                { "name": "status", "type": "code", "min": 1 },
                { "name": "serialNumber", "type": "string" },
                { "name": "udi", "type": "Device.udi", "array": true, "max": 2 },
                { "name": "manufactured[x]", "types": ["date", "dateTime"] }
            ]
        },
        "Device.udi": {
            "kind": "backbone",
            "base": "Element",
            "properties": [
                { "name": "carrier", "type": "string", "min": 1 }
            ]
        }
    }
}"#;

fn catalog_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("00-base.yaml"), BASE_YAML).unwrap();
    fs::write(dir.path().join("10-device.json"), DEVICE_JSON).unwrap();
    fs::write(dir.path().join("README.txt"), "not a schema").unwrap();
    dir
}

#[test]
fn test_load_mixed_format_directory() {
    let dir = catalog_dir();
    let catalog = SchemaCatalog::load_dir(dir.path()).unwrap();

    assert_eq!(catalog.len(), 4);
    assert_eq!(catalog.fhir_version(), Some("4.0.1"));
    assert_eq!(catalog.resource_types().collect::<Vec<_>>(), vec!["Device"]);

    let device = catalog.lookup("Device").unwrap();
    let names: Vec<&str> = device.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["id", "status", "serialNumber", "udi", "manufactured[x]"]
    );
}

#[test]
fn test_validator_over_directory_catalog() {
    let dir = catalog_dir();
    let config = ValidatorConfig::default()
        .with_catalog_dir(dir.path())
        .with_strict_mode(true);
    let validator = FhirValidator::from_config(&config).unwrap();

    let valid = validator
        .validate(&json!({
            "resourceType": "Device",
            "status": "active",
            "udi": [{"carrier": "(01)00844588003288"}],
            "manufacturedDate": "2023-06-01"
        }))
        .unwrap();
    assert!(valid.issue.is_empty(), "{:?}", valid.issue);

    let invalid = validator
        .validate(&json!({
            "resourceType": "Device",
            "udi": [{"carrier": "a"}, {"carrier": "b"}, {}],
            "lotNumber": "L1"
        }))
        .unwrap();
    let found: Vec<(IssueCode, String)> = invalid
        .issue
        .iter()
        .map(|issue| (issue.code, issue.expression.join("|")))
        .collect();
    assert_eq!(
        found,
        vec![
            (IssueCode::Required, "Device.status".to_string()),
            (IssueCode::Structure, "Device.udi".to_string()),
            (IssueCode::Structure, "Device.lotNumber".to_string()),
            (IssueCode::Required, "Device.udi[2].carrier".to_string()),
        ]
    );
    assert!(invalid.issue.iter().all(|issue| issue.is_error()));

    // Types of the embedded catalogs are not part of a directory catalog.
    let outcome = validator
        .validate(&json!({"resourceType": "Patient"}))
        .unwrap();
    assert_eq!(outcome.issue[0].code, IssueCode::Invalid);
}

#[test]
fn test_empty_directory_is_rejected() {
    let dir = TempDir::new().unwrap();
    let result = SchemaCatalog::load_dir(dir.path());
    assert!(matches!(result, Err(YafvError::InvalidCatalog { .. })));
}

#[test]
fn test_broken_reference_is_rejected_at_load() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("base.yaml"), BASE_YAML).unwrap();
    fs::write(
        dir.path().join("broken.json"),
        r#"{"types": {"Device": {"kind": "resource", "properties": [
            {"name": "owner", "type": "Reference"}
        ]}}}"#,
    )
    .unwrap();

    let config = ValidatorConfig::default().with_catalog_dir(dir.path());
    let err = FhirValidator::from_config(&config).unwrap_err();
    assert!(err.to_string().contains("unknown type 'Reference'"));
}

#[test]
fn test_malformed_document_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
    assert!(matches!(
        SchemaCatalog::load_dir(dir.path()),
        Err(YafvError::Serialization(_))
    ));
}

#[test]
fn test_catalog_built_in_memory() {
    let documents = [
        CatalogDocument::from_yaml_str(BASE_YAML).unwrap(),
        CatalogDocument::from_json_str(DEVICE_JSON).unwrap(),
    ];
    let catalog = Arc::new(SchemaCatalog::from_documents(documents).unwrap());
    let validator = FhirValidator::new(catalog);

    let outcome = validator
        .validate_as(&json!({"carrier": 12}), "Device.udi")
        .unwrap();
    assert_eq!(outcome.issue.len(), 1);
    assert_eq!(outcome.issue[0].expression, vec!["Device.udi.carrier"]);
}

#[test]
fn test_config_files() {
    let dir = TempDir::new().unwrap();

    let yaml = dir.path().join("yafv.yaml");
    fs::write(&yaml, "fhirVersion: \"5.0.0\"\nstrictMode: true\n").unwrap();
    let config = ValidatorConfig::from_file(&yaml).unwrap();
    assert_eq!(config.fhir_version, FhirVersion::R5);
    assert!(config.strict_mode);

    let json = dir.path().join("yafv.json");
    fs::write(&json, r#"{"checkPrimitiveFormats": false, "maxDepth": 16}"#).unwrap();
    let config = ValidatorConfig::from_file(&json).unwrap();
    assert!(!config.check_primitive_formats);
    assert_eq!(config.max_depth, 16);

    let validator = FhirValidator::from_config(&config).unwrap();
    assert_eq!(validator.options().max_depth, 16);
    assert_eq!(validator.catalog().fhir_version(), Some("4.0.1"));

    let missing = dir.path().join("missing.json");
    assert!(matches!(
        ValidatorConfig::from_file(&missing),
        Err(YafvError::Io(_))
    ));
}
