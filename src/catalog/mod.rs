//! Schema catalog: read-only lookup of per-type property metadata.
//!
//! The catalog is built once from declarative [`CatalogDocument`]s. Base
//! chains are flattened, choice groups expanded and type references checked
//! at construction, so lookups during validation only fail for type names
//! that were never declared.

pub mod document;
pub mod entry;

pub use document::{CatalogDocument, PropertyDocument, TypeDocument};
pub use entry::{ChoiceGroup, ChoiceMember, SchemaEntry, Shape, TypeKind, type_suffix};

use crate::error::{Result, YafvError};
use crate::validation::primitive::PrimitiveKind;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Polymorphic type name: the value names its own type via `resourceType`.
pub const RESOURCE_TYPE: &str = "Resource";

/// Type used to validate `_<name>` primitive extension companions.
pub const ELEMENT_TYPE: &str = "Element";

/// Where a JSON property name lands in a type schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropertyRef {
    Entry(usize),
    ChoiceMember { entry: usize, member: usize },
}

/// A JSON property name resolved against a type schema.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedProperty<'a> {
    Entry(&'a SchemaEntry),
    ChoiceMember(&'a SchemaEntry, &'a ChoiceMember),
}

impl<'a> ResolvedProperty<'a> {
    pub fn entry(&self) -> &'a SchemaEntry {
        match self {
            ResolvedProperty::Entry(entry) => entry,
            ResolvedProperty::ChoiceMember(entry, _) => entry,
        }
    }

    /// Type names the property value may hold.
    pub fn type_names(&self) -> Vec<&'a str> {
        match self {
            ResolvedProperty::Entry(entry) => {
                entry.expected_types.iter().map(String::as_str).collect()
            }
            ResolvedProperty::ChoiceMember(_, member) => vec![member.type_name.as_str()],
        }
    }

    /// Whether every accepted type is a primitive (so a `_<name>` companion is allowed).
    pub fn is_primitive(&self) -> bool {
        let types = self.type_names();
        !types.is_empty() && types.iter().all(|t| PrimitiveKind::from_type_name(t).is_some())
    }
}

/// Flattened schema of one catalog type.
#[derive(Debug, Clone)]
pub struct TypeSchema {
    name: String,
    kind: TypeKind,
    base: Option<String>,
    entries: Vec<SchemaEntry>,
    properties: HashMap<String, PropertyRef>,
}

impl TypeSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Declared entries in FHIR order, inherited ones first.
    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    /// Entry by declared name (`birthDate`, `deceased[x]`).
    pub fn entry(&self, name: &str) -> Option<&SchemaEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Resolves a JSON property name (`birthDate`, `deceasedBoolean`).
    pub fn resolve_property(&self, property: &str) -> Option<ResolvedProperty<'_>> {
        match *self.properties.get(property)? {
            PropertyRef::Entry(index) => Some(ResolvedProperty::Entry(&self.entries[index])),
            PropertyRef::ChoiceMember { entry, member } => {
                let entry = &self.entries[entry];
                let group = entry.choice_group.as_ref()?;
                Some(ResolvedProperty::ChoiceMember(entry, &group.members[member]))
            }
        }
    }

    pub fn choice_groups(&self) -> impl Iterator<Item = (&SchemaEntry, &ChoiceGroup)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.choice_group.as_ref().map(|group| (entry, group)))
    }
}

/// Read-only catalog of type schemas keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    fhir_version: Option<String>,
    types: IndexMap<String, TypeSchema>,
}

impl SchemaCatalog {
    /// Builds a catalog from one or more documents.
    pub fn from_documents(documents: impl IntoIterator<Item = CatalogDocument>) -> Result<Self> {
        let mut fhir_version = None;
        let mut declared: IndexMap<String, TypeDocument> = IndexMap::new();

        for document in documents {
            if let Some(version) = document.fhir_version {
                match &fhir_version {
                    Some(existing) if existing != &version => {
                        return Err(YafvError::invalid_catalog(format!(
                            "documents disagree on FHIR version: {existing} vs {version}"
                        )));
                    }
                    _ => fhir_version = Some(version),
                }
            }
            for (name, type_doc) in document.types {
                if declared.contains_key(&name) {
                    return Err(YafvError::invalid_catalog(format!(
                        "type '{name}' is declared more than once"
                    )));
                }
                declared.insert(name, type_doc);
            }
        }

        let mut types = IndexMap::with_capacity(declared.len());
        for (name, type_doc) in &declared {
            let properties = flatten_properties(name, &declared)?;
            let schema = build_type_schema(name, type_doc, &properties)?;
            types.insert(name.clone(), schema);
        }

        let catalog = Self {
            fhir_version,
            types,
        };
        catalog.verify_references()?;

        tracing::info!(
            "Built schema catalog with {} types ({} resources)",
            catalog.len(),
            catalog.resource_types().count()
        );
        Ok(catalog)
    }

    /// Builds a catalog from every schema document in a directory.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let documents = CatalogDocument::load_dir(dir)?;
        if documents.is_empty() {
            return Err(YafvError::invalid_catalog(format!(
                "no schema documents found in {}",
                dir.display()
            )));
        }
        Self::from_documents(documents)
    }

    /// Returns the schema of `type_name` or `SchemaNotFound`.
    pub fn lookup(&self, type_name: &str) -> Result<&TypeSchema> {
        self.get(type_name)
            .ok_or_else(|| YafvError::schema_not_found(type_name))
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeSchema> {
        self.types.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn is_resource_type(&self, type_name: &str) -> bool {
        self.get(type_name)
            .is_some_and(|schema| schema.kind == TypeKind::Resource)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.types
            .values()
            .filter(|schema| schema.kind == TypeKind::Resource)
            .map(|schema| schema.name.as_str())
    }

    pub fn fhir_version(&self) -> Option<&str> {
        self.fhir_version.as_deref()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn verify_references(&self) -> Result<()> {
        let mut uses_primitives = false;
        for schema in self.types.values() {
            for entry in &schema.entries {
                for type_name in &entry.expected_types {
                    if PrimitiveKind::from_type_name(type_name).is_some() {
                        uses_primitives = true;
                    } else if !self.contains(type_name) {
                        return Err(YafvError::invalid_catalog(format!(
                            "{}.{} refers to unknown type '{}'",
                            schema.name, entry.name, type_name
                        )));
                    }
                }
            }
        }
        if uses_primitives && !self.contains(ELEMENT_TYPE) {
            return Err(YafvError::invalid_catalog(format!(
                "catalog declares primitive properties but no '{ELEMENT_TYPE}' type for their extensions"
            )));
        }
        Ok(())
    }
}

/// Collects the properties of `name` and its base chain, base first.
fn flatten_properties<'a>(
    name: &str,
    declared: &'a IndexMap<String, TypeDocument>,
) -> Result<Vec<&'a PropertyDocument>> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut current = name;

    loop {
        if !visited.insert(current) {
            return Err(YafvError::invalid_catalog(format!(
                "cycle in base chain of '{name}' at '{current}'"
            )));
        }
        let type_doc = declared.get(current).ok_or_else(|| {
            YafvError::invalid_catalog(format!(
                "base type '{current}' of '{name}' is not declared"
            ))
        })?;
        chain.push(type_doc);
        match &type_doc.base {
            Some(base) => current = base.as_str(),
            None => break,
        }
    }

    Ok(chain
        .into_iter()
        .rev()
        .flat_map(|type_doc| type_doc.properties.iter())
        .collect())
}

fn build_type_schema(
    name: &str,
    type_doc: &TypeDocument,
    properties: &[&PropertyDocument],
) -> Result<TypeSchema> {
    let mut entries = Vec::with_capacity(properties.len());
    let mut index = HashMap::new();

    for property in properties {
        let entry = build_entry(name, property)?;
        let position = entries.len();

        let mut claim = |key: &str, target: PropertyRef| -> Result<()> {
            if index.insert(key.to_string(), target).is_some() {
                return Err(YafvError::invalid_catalog(format!(
                    "property '{key}' is declared more than once in '{name}'"
                )));
            }
            Ok(())
        };

        match &entry.choice_group {
            Some(group) => {
                for (member, choice) in group.members.iter().enumerate() {
                    claim(
                        &choice.property,
                        PropertyRef::ChoiceMember {
                            entry: position,
                            member,
                        },
                    )?;
                }
                claim(&entry.name, PropertyRef::Entry(position))?;
            }
            None => claim(&entry.name, PropertyRef::Entry(position))?,
        }
        entries.push(entry);
    }

    Ok(TypeSchema {
        name: name.to_string(),
        kind: type_doc.kind,
        base: type_doc.base.clone(),
        entries,
        properties: index,
    })
}

fn build_entry(type_name: &str, property: &PropertyDocument) -> Result<SchemaEntry> {
    let invalid = |reason: &str| {
        YafvError::invalid_catalog(format!("{type_name}.{}: {reason}", property.name))
    };

    if property.name.is_empty() || property.name.starts_with('_') {
        return Err(invalid("property names must be non-empty and not start with '_'"));
    }
    if let Some(max) = property.max
        && max < property.min
    {
        return Err(invalid("max is lower than min"));
    }

    match property.name.strip_suffix("[x]") {
        Some(id) => {
            if property.type_name.is_some() {
                return Err(invalid("choice properties declare 'types', not 'type'"));
            }
            if property.array {
                return Err(invalid("choice properties cannot be arrays"));
            }
            let types = match &property.types {
                Some(types) if !types.is_empty() => types,
                _ => return Err(invalid("choice properties need at least one type")),
            };
            Ok(SchemaEntry {
                name: property.name.clone(),
                min: property.min,
                max: None,
                shape: Shape::Scalar,
                expected_types: types.clone(),
                choice_group: Some(ChoiceGroup::new(id, types)),
            })
        }
        None => {
            if property.types.is_some() {
                return Err(invalid("only '[x]' properties may declare 'types'"));
            }
            let declared = property
                .type_name
                .as_ref()
                .ok_or_else(|| invalid("missing 'type'"))?;
            Ok(SchemaEntry {
                name: property.name.clone(),
                min: property.min,
                max: if property.array { property.max } else { None },
                shape: if property.array {
                    Shape::Array
                } else {
                    Shape::Scalar
                },
                expected_types: vec![declared.clone()],
                choice_group: None,
            })
        }
    }
}
