use crate::error::{Result, YafvError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default limit on object nesting below the resource root.
pub const DEFAULT_MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorConfig {
    pub fhir_version: FhirVersion,
    /// Report unknown properties as errors instead of warnings
    pub strict_mode: bool,
    pub report_unknown_properties: bool,
    /// Check lexical formats of primitives (dates, ids, urls) on top of their JSON kind
    pub check_primitive_formats: bool,
    pub max_depth: usize,
    /// Directory of schema documents replacing the embedded catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FhirVersion {
    #[default]
    #[serde(rename = "4.0.1")]
    R4,
    #[serde(rename = "4.3.0")]
    R4B,
    #[serde(rename = "5.0.0")]
    R5,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            fhir_version: FhirVersion::R4,
            strict_mode: false,
            report_unknown_properties: true,
            check_primitive_formats: true,
            max_depth: DEFAULT_MAX_DEPTH,
            catalog_dir: None,
        }
    }
}

impl ValidatorConfig {
    pub fn for_version(version: FhirVersion) -> Self {
        Self {
            fhir_version: version,
            ..Default::default()
        }
    }

    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn with_unknown_properties(mut self, report: bool) -> Self {
        self.report_unknown_properties = report;
        self
    }

    pub fn with_primitive_formats(mut self, check: bool) -> Self {
        self.check_primitive_formats = check;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_catalog_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.catalog_dir = Some(dir.into());
        self
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validated()
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validated()
    }

    /// Loads a configuration file; `.yaml`/`.yml` files are read as YAML,
    /// everything else as JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    fn validated(self) -> Result<Self> {
        if self.max_depth == 0 {
            return Err(YafvError::invalid_config("maxDepth must be at least 1"));
        }
        Ok(self)
    }
}

impl std::fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.package_version())
    }
}

impl FhirVersion {
    /// Get all supported FHIR versions
    pub fn all() -> &'static [FhirVersion] {
        &[FhirVersion::R4, FhirVersion::R4B, FhirVersion::R5]
    }

    pub fn package_version(&self) -> &'static str {
        match self {
            FhirVersion::R4 => "4.0.1",
            FhirVersion::R4B => "4.3.0",
            FhirVersion::R5 => "5.0.0",
        }
    }

    /// Get a short identifier for this version (e.g., "r4", "r4b")
    pub fn short_name(&self) -> &'static str {
        match self {
            FhirVersion::R4 => "r4",
            FhirVersion::R4B => "r4b",
            FhirVersion::R5 => "r5",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "r4" | "4.0" | "4.0.1" => Some(FhirVersion::R4),
            "r4b" | "4.3" | "4.3.0" => Some(FhirVersion::R4B),
            "r5" | "5.0" | "5.0.0" => Some(FhirVersion::R5),
            _ => None,
        }
    }
}

impl std::str::FromStr for FhirVersion {
    type Err = YafvError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
            .ok_or_else(|| YafvError::invalid_config(format!("unsupported FHIR version '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ValidatorConfig::default();
        assert_eq!(config.fhir_version, FhirVersion::R4);
        assert!(!config.strict_mode);
        assert!(config.report_unknown_properties);
        assert!(config.check_primitive_formats);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_builder_methods() {
        let config = ValidatorConfig::for_version(FhirVersion::R5)
            .with_strict_mode(true)
            .with_primitive_formats(false)
            .with_max_depth(8)
            .with_catalog_dir("/tmp/schemas");

        assert_eq!(config.fhir_version, FhirVersion::R5);
        assert!(config.strict_mode);
        assert!(!config.check_primitive_formats);
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.catalog_dir, Some(PathBuf::from("/tmp/schemas")));
    }

    #[test]
    fn test_json_config_with_partial_fields() {
        let config = ValidatorConfig::from_json_str(
            r#"{"fhirVersion": "5.0.0", "strictMode": true}"#,
        )
        .unwrap();
        assert_eq!(config.fhir_version, FhirVersion::R5);
        assert!(config.strict_mode);
        assert!(config.report_unknown_properties);
    }

    #[test]
    fn test_yaml_config() {
        let config = ValidatorConfig::from_yaml_str(
            "fhirVersion: \"4.3.0\"\nreportUnknownProperties: false\nmaxDepth: 32\n",
        )
        .unwrap();
        assert_eq!(config.fhir_version, FhirVersion::R4B);
        assert!(!config.report_unknown_properties);
        assert_eq!(config.max_depth, 32);
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        let result = ValidatorConfig::from_json_str(r#"{"maxDepth": 0}"#);
        assert!(matches!(result, Err(YafvError::InvalidConfig { .. })));
    }

    #[test]
    fn test_version_parsing() {
        assert_eq!(FhirVersion::parse("R4B"), Some(FhirVersion::R4B));
        assert_eq!("5.0.0".parse::<FhirVersion>().unwrap(), FhirVersion::R5);
        assert!("6.0".parse::<FhirVersion>().is_err());
        assert_eq!(FhirVersion::R4.to_string(), "4.0.1");
        assert_eq!(FhirVersion::all().len(), 3);
    }
}
