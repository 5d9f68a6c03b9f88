//! Structural validation of FHIR resources against a [`SchemaCatalog`].
//!
//! [`FhirValidator`] resolves the resource's `resourceType`, then walks the
//! tree with an explicit worklist: each object is checked entry by entry
//! (cardinality, choice groups, primitive types, `_<name>` companions,
//! undeclared keys) and every nested complex value becomes a new work item.
//! All problems found on the way are returned as issues of one
//! [`OperationOutcome`]; an `Err` means the catalog itself is broken.

pub mod cardinality;
pub mod choice;
pub mod outcome;
pub mod primitive;

pub use cardinality::{CardinalityChecker, CardinalityResult};
pub use choice::{ChoiceResolution, ChoiceResolver};
pub use outcome::{
    Coding, DiagnosticsBuilder, ISSUE_TYPE_SYSTEM, Issue, IssueCode, IssueDetails, IssueSeverity,
    OperationOutcome,
};
pub use primitive::{JsonKind, PrimitiveKind, TypeChecker, TypeMatch, TypeMismatch};

use crate::catalog::{
    ChoiceGroup, ELEMENT_TYPE, ResolvedProperty, SchemaCatalog, SchemaEntry, TypeKind, TypeSchema,
};
use crate::config::{DEFAULT_MAX_DEPTH, FhirVersion, ValidatorConfig};
use crate::embedded;
use crate::error::Result;
use crate::path::ElementPath;
use cardinality::is_absent;
use choice::companion_name;
use serde_json::{Map, Value};
use std::sync::Arc;

const RESOURCE_TYPE_KEY: &str = "resourceType";

/// Knobs of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Unknown properties are errors rather than warnings
    pub strict_mode: bool,
    pub report_unknown_properties: bool,
    pub check_primitive_formats: bool,
    /// Objects nested deeper than this below the root are not descended into
    pub max_depth: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            strict_mode: false,
            report_unknown_properties: true,
            check_primitive_formats: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl From<&ValidatorConfig> for ValidationOptions {
    fn from(config: &ValidatorConfig) -> Self {
        Self {
            strict_mode: config.strict_mode,
            report_unknown_properties: config.report_unknown_properties,
            check_primitive_formats: config.check_primitive_formats,
            max_depth: config.max_depth,
        }
    }
}

impl ValidationOptions {
    fn unknown_property_severity(&self) -> IssueSeverity {
        if self.strict_mode {
            IssueSeverity::Error
        } else {
            IssueSeverity::Warning
        }
    }
}

/// Schema-driven validator. Cheap to clone; safe to share across threads.
#[derive(Debug, Clone)]
pub struct FhirValidator {
    catalog: Arc<SchemaCatalog>,
    options: ValidationOptions,
    checker: TypeChecker,
}

impl FhirValidator {
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self::with_options(catalog, ValidationOptions::default())
    }

    pub fn with_options(catalog: Arc<SchemaCatalog>, options: ValidationOptions) -> Self {
        Self {
            catalog,
            checker: TypeChecker::new(options.check_primitive_formats),
            options,
        }
    }

    /// Validator over the embedded catalog of `version`.
    pub fn for_version(version: FhirVersion) -> Result<Self> {
        Ok(Self::new(embedded::catalog(version)?))
    }

    /// Validator over the configured catalog directory, or the embedded
    /// catalog of the configured version.
    pub fn from_config(config: &ValidatorConfig) -> Result<Self> {
        let catalog = match &config.catalog_dir {
            Some(dir) => {
                tracing::info!("Loading schema catalog from {}", dir.display());
                Arc::new(SchemaCatalog::load_dir(dir)?)
            }
            None => embedded::catalog(config.fhir_version)?,
        };
        Ok(Self::with_options(catalog, ValidationOptions::from(config)))
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Validates a resource typed by its own `resourceType`.
    pub fn validate(&self, resource: &Value) -> Result<OperationOutcome> {
        let object = match resource {
            Value::Object(object) => object,
            other => {
                return Ok(OperationOutcome::new(vec![DiagnosticsBuilder::invalid_input(
                    None,
                    format!("Expected a FHIR resource object, found {}", JsonKind::of(other)),
                )]));
            }
        };

        match self.resource_schema(object, None) {
            Ok(schema) => self.run(schema, object, ElementPath::root(schema.name())),
            Err(issue) => Ok(OperationOutcome::new(vec![issue])),
        }
    }

    /// Validates an object against a named catalog type, e.g. a bare
    /// `HumanName` or `Patient.contact`.
    pub fn validate_as(&self, value: &Value, type_name: &str) -> Result<OperationOutcome> {
        let schema = self.catalog.lookup(type_name)?;
        let path = ElementPath::root(schema.name());
        match value {
            Value::Object(object) => self.run(schema, object, path),
            other => Ok(OperationOutcome::new(vec![DiagnosticsBuilder::invalid_input(
                Some(&path),
                format!(
                    "Expected an object of type '{type_name}', found {}",
                    JsonKind::of(other)
                ),
            )])),
        }
    }

    fn run(&self, schema: &TypeSchema, object: &Map<String, Value>, path: ElementPath) -> Result<OperationOutcome> {
        tracing::debug!("Validating {} against schema {}", path, schema.name());

        let mut walk = Walk {
            validator: self,
            stack: vec![Frame {
                schema,
                object,
                path,
                depth: 0,
            }],
            issues: Vec::new(),
        };
        while let Some(frame) = walk.stack.pop() {
            walk.visit(frame)?;
        }

        let outcome = OperationOutcome::new(walk.issues);
        tracing::debug!(
            "Validation of {} finished: {} error(s), {} warning(s)",
            schema.name(),
            outcome.error_count(),
            outcome.warning_count()
        );
        Ok(outcome)
    }

    /// Resolves the concrete resource schema named by an object's
    /// `resourceType`. `location` is the path of a nested resource.
    fn resource_schema<'c>(
        &'c self,
        object: &Map<String, Value>,
        location: Option<&ElementPath>,
    ) -> std::result::Result<&'c TypeSchema, Issue> {
        let type_path = match location {
            Some(path) => path.field(RESOURCE_TYPE_KEY),
            None => ElementPath::root(RESOURCE_TYPE_KEY),
        };
        let at = location
            .map(|path| format!(" at '{path}'"))
            .unwrap_or_default();

        let resource_type = match object.get(RESOURCE_TYPE_KEY) {
            None | Some(Value::Null) => {
                return Err(DiagnosticsBuilder::invalid_input(
                    Some(&type_path),
                    format!("Missing 'resourceType' for resource{at}"),
                ));
            }
            Some(Value::String(name)) => name.as_str(),
            Some(other) => {
                return Err(DiagnosticsBuilder::invalid_input(
                    Some(&type_path),
                    format!("'resourceType'{at} must be a string, found {}", JsonKind::of(other)),
                ));
            }
        };

        match self.catalog.get(resource_type) {
            Some(schema) if schema.kind() == TypeKind::Resource => Ok(schema),
            Some(_) => Err(DiagnosticsBuilder::invalid_input(
                Some(&type_path),
                format!("'{resource_type}'{at} is not a resource type"),
            )),
            None => Err(DiagnosticsBuilder::invalid_input(
                Some(&type_path),
                format!("Unknown resource type '{resource_type}'{at}"),
            )),
        }
    }
}

/// One object waiting to be checked against a type schema.
struct Frame<'c, 'v> {
    schema: &'c TypeSchema,
    object: &'v Map<String, Value>,
    path: ElementPath,
    depth: usize,
}

/// State of a single validation run.
struct Walk<'c, 'v> {
    validator: &'c FhirValidator,
    stack: Vec<Frame<'c, 'v>>,
    issues: Vec<Issue>,
}

impl<'c, 'v> Walk<'c, 'v> {
    fn catalog(&self) -> &'c SchemaCatalog {
        &self.validator.catalog
    }

    fn visit(&mut self, frame: Frame<'c, 'v>) -> Result<()> {
        if frame.depth > self.validator.options.max_depth {
            self.issues.push(DiagnosticsBuilder::depth_exceeded(
                &frame.path,
                self.validator.options.max_depth,
            ));
            return Ok(());
        }

        let mut children = Vec::new();
        for entry in frame.schema.entries() {
            match &entry.choice_group {
                Some(group) => self.visit_choice(&frame, entry, group, &mut children)?,
                None => self.visit_entry(&frame, entry, &mut children)?,
            }
        }
        self.check_undeclared(&frame);

        // Reversed so that children are visited in document order.
        self.stack.extend(children.into_iter().rev());
        Ok(())
    }

    fn visit_entry(
        &mut self,
        frame: &Frame<'c, 'v>,
        entry: &'c SchemaEntry,
        children: &mut Vec<Frame<'c, 'v>>,
    ) -> Result<()> {
        let path = frame.path.field(entry.name.as_str());
        let value = frame.object.get(&entry.name);
        let primitive = ResolvedProperty::Entry(entry).is_primitive();
        let companion = if primitive {
            frame
                .object
                .get(&companion_name(&entry.name))
                .filter(|companion| !companion.is_null())
        } else {
            None
        };

        if let Some(companion) = companion {
            self.visit_companion(frame, &entry.name, entry.is_array(), companion, children)?;
            if let (Some(Value::Array(values)), Value::Array(companions)) = (value, companion)
                && entry.is_array()
                && values.len() != companions.len()
            {
                self.issues.push(DiagnosticsBuilder::companion_length_mismatch(
                    &frame.path.field(companion_name(&entry.name)),
                    values.len(),
                    companions.len(),
                ));
            }
            if is_absent(value) {
                // Extension-only primitive
                return Ok(());
            }
        }

        match CardinalityChecker::check(value, entry, &path) {
            CardinalityResult::Absent => {}
            CardinalityResult::Violation(issue) => self.issues.push(issue),
            CardinalityResult::Scalar(value) => {
                self.check_value(value, &entry.expected_types, path, frame.depth, children)?;
            }
            CardinalityResult::Array { items, overflow } => {
                self.issues.extend(overflow);
                for (index, item) in items.iter().enumerate() {
                    let item_path = path.index(index);
                    if item.is_null() {
                        if !(primitive && CardinalityChecker::null_item_allowed(companion, index)) {
                            self.issues.push(DiagnosticsBuilder::null_item(&item_path));
                        }
                        continue;
                    }
                    self.check_value(item, &entry.expected_types, item_path, frame.depth, children)?;
                }
            }
        }
        Ok(())
    }

    fn visit_choice(
        &mut self,
        frame: &Frame<'c, 'v>,
        entry: &'c SchemaEntry,
        group: &'c ChoiceGroup,
        children: &mut Vec<Frame<'c, 'v>>,
    ) -> Result<()> {
        let resolution = ChoiceResolver::resolve(frame.object, entry, group, &frame.path);
        self.issues.extend(resolution.issues);

        for (member, value) in resolution.present {
            let path = frame.path.field(member.property.as_str());
            match CardinalityChecker::check(Some(value), entry, &path) {
                CardinalityResult::Scalar(value) => {
                    let expected = std::slice::from_ref(&member.type_name);
                    self.check_value(value, expected, path, frame.depth, children)?;
                }
                CardinalityResult::Violation(issue) => self.issues.push(issue),
                CardinalityResult::Absent | CardinalityResult::Array { .. } => {}
            }
        }

        for (member, companion) in resolution.companions {
            if PrimitiveKind::from_type_name(&member.type_name).is_some() {
                self.visit_companion(frame, &member.property, false, companion, children)?;
            }
        }
        Ok(())
    }

    /// Checks the `_<property>` companion of a primitive and queues its
    /// `Element` objects.
    fn visit_companion(
        &mut self,
        frame: &Frame<'c, 'v>,
        property: &str,
        array: bool,
        companion: &'v Value,
        children: &mut Vec<Frame<'c, 'v>>,
    ) -> Result<()> {
        let element = self.catalog().lookup(ELEMENT_TYPE)?;
        let path = frame.path.field(companion_name(property));
        let depth = frame.depth + 1;

        match (array, companion) {
            (false, Value::Object(object)) => children.push(Frame {
                schema: element,
                object,
                path,
                depth,
            }),
            (false, other) => self.issues.push(DiagnosticsBuilder::invalid_companion(
                &path,
                JsonKind::of(other),
                "an Element object",
            )),
            (true, Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    match item {
                        Value::Null => {}
                        Value::Object(object) => children.push(Frame {
                            schema: element,
                            object,
                            path: path.index(index),
                            depth,
                        }),
                        other => self.issues.push(DiagnosticsBuilder::invalid_companion(
                            &path.index(index),
                            JsonKind::of(other),
                            "an Element object or null",
                        )),
                    }
                }
            }
            (true, other) => self.issues.push(DiagnosticsBuilder::invalid_companion(
                &path,
                JsonKind::of(other),
                "an array",
            )),
        }
        Ok(())
    }

    /// Type-checks one scalar value (or array item) and queues it when it
    /// is a complex type or a nested resource.
    fn check_value(
        &mut self,
        value: &'v Value,
        expected: &'c [String],
        path: ElementPath,
        depth: usize,
        children: &mut Vec<Frame<'c, 'v>>,
    ) -> Result<()> {
        match self.validator.checker.check(value, expected) {
            Ok(TypeMatch::Primitive(_)) => {}
            Ok(TypeMatch::Complex(type_name)) => {
                let schema = self.catalog().lookup(type_name)?;
                if let Value::Object(object) = value {
                    children.push(Frame {
                        schema,
                        object,
                        path,
                        depth: depth + 1,
                    });
                }
            }
            Ok(TypeMatch::Resource) => {
                if let Value::Object(object) = value {
                    match self.validator.resource_schema(object, Some(&path)) {
                        Ok(schema) => children.push(Frame {
                            schema,
                            object,
                            path,
                            depth: depth + 1,
                        }),
                        Err(issue) => self.issues.push(issue),
                    }
                }
            }
            Err(mismatch) => self
                .issues
                .push(DiagnosticsBuilder::type_mismatch(&path, &mismatch)),
        }
        Ok(())
    }

    /// Reports keys that are neither declared entries, choice members nor
    /// companions of primitive properties.
    fn check_undeclared(&mut self, frame: &Frame<'c, 'v>) {
        let options = self.validator.options;

        for key in frame.object.keys() {
            if key == RESOURCE_TYPE_KEY && frame.schema.kind() == TypeKind::Resource {
                continue;
            }
            match frame.schema.resolve_property(key) {
                Some(ResolvedProperty::Entry(entry)) if entry.is_choice() => {}
                Some(_) => continue,
                None => {}
            }
            if let Some(base) = key.strip_prefix('_')
                && is_companion_of_primitive(frame.schema, base)
            {
                continue;
            }

            let path = frame.path.field(key.as_str());
            if let Some((group, suffix)) = ChoiceResolver::misnamed_member(frame.schema, key) {
                self.issues
                    .push(ChoiceResolver::invalid_suffix_issue(&path, group, suffix));
            } else if options.report_unknown_properties {
                self.issues.push(
                    DiagnosticsBuilder::unknown_property(&path)
                        .with_severity(options.unknown_property_severity()),
                );
            }
        }
    }
}

/// `_<base>` names a companion only when `base` is a primitive property
/// name; a choice group's `[x]` spelling is not one.
fn is_companion_of_primitive(schema: &TypeSchema, base: &str) -> bool {
    match schema.resolve_property(base) {
        Some(ResolvedProperty::Entry(entry)) if entry.is_choice() => false,
        Some(property) => property.is_primitive(),
        None => false,
    }
}
