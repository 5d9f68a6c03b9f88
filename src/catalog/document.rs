//! Declarative schema documents.
//!
//! A document is a JSON or YAML table of type definitions:
//!
//! ```json
//! {
//!   "fhirVersion": "4.0.1",
//!   "types": {
//!     "Patient": {
//!       "kind": "resource",
//!       "base": "DomainResource",
//!       "properties": [
//!         { "name": "active", "type": "boolean" },
//!         { "name": "name", "type": "HumanName", "array": true },
//!         { "name": "deceased[x]", "types": ["boolean", "dateTime"] }
//!       ]
//!     }
//!   }
//! }
//! ```

use crate::catalog::entry::TypeKind;
use crate::error::{Result, YafvError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One schema document; several documents can be merged into a catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(rename = "fhirVersion", skip_serializing_if = "Option::is_none")]
    pub fhir_version: Option<String>,
    #[serde(default)]
    pub types: IndexMap<String, TypeDocument>,
}

/// Definition of one named type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDocument {
    pub kind: TypeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDocument>,
}

/// Definition of one property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDocument {
    pub name: String,
    /// Type of a non-choice property
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Allowed types of a `[x]` property
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    #[serde(default)]
    pub min: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    #[serde(default)]
    pub array: bool,
}

impl CatalogDocument {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reads a document, choosing the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match document_format(path) {
            Some(DocumentFormat::Json) => Self::from_json_str(&content),
            Some(DocumentFormat::Yaml) => Self::from_yaml_str(&content),
            None => Err(YafvError::invalid_catalog(format!(
                "unsupported schema document extension: {}",
                path.display()
            ))),
        }
    }

    /// Loads every `*.json`, `*.yaml` and `*.yml` file of a directory,
    /// sorted by file name.
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && document_format(&path).is_some() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            tracing::debug!("Loading schema document {}", path.display());
            documents.push(Self::from_path(&path)?);
        }
        Ok(documents)
    }
}

enum DocumentFormat {
    Json,
    Yaml,
}

fn document_format(path: &Path) -> Option<DocumentFormat> {
    match path.extension()?.to_str()? {
        "json" => Some(DocumentFormat::Json),
        "yaml" | "yml" => Some(DocumentFormat::Yaml),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_document() {
        let doc = CatalogDocument::from_json_str(
            r#"{
                "fhirVersion": "4.0.1",
                "types": {
                    "Basic": {
                        "kind": "resource",
                        "properties": [
                            { "name": "code", "type": "string", "min": 1 },
                            { "name": "tag", "type": "string", "array": true, "max": 3 },
                            { "name": "value[x]", "types": ["string", "boolean"] }
                        ]
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(doc.fhir_version.as_deref(), Some("4.0.1"));
        let basic = &doc.types["Basic"];
        assert_eq!(basic.kind, TypeKind::Resource);
        assert_eq!(basic.properties.len(), 3);
        assert_eq!(basic.properties[0].min, 1);
        assert!(basic.properties[1].array);
        assert_eq!(basic.properties[1].max, Some(3));
        assert_eq!(basic.properties[2].types.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_yaml_document() {
        let doc = CatalogDocument::from_yaml_str(
            r#"
types:
  Money:
    kind: complex
    properties:
      - name: value
        type: decimal
      - name: currency
        type: code
"#,
        )
        .unwrap();

        assert!(doc.fhir_version.is_none());
        assert_eq!(doc.types["Money"].kind, TypeKind::Complex);
        assert_eq!(doc.types["Money"].properties[1].name, "currency");
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result = CatalogDocument::from_json_str(r#"{"types": {"X": {"kind": "widget"}}}"#);
        assert!(matches!(result, Err(YafvError::Serialization(_))));
    }
}
