//! Schema entry types: one declared property of a catalog type.

use serde::{Deserialize, Serialize};

/// Kind of a catalog type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeKind {
    /// A concrete resource, validated when named by `resourceType`
    Resource,
    /// A backbone element owned by one resource (`Patient.contact`)
    Backbone,
    /// A reusable complex datatype (`HumanName`, `Reference`)
    Complex,
    /// A base type that only contributes inherited properties
    Abstract,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Resource => "resource",
            TypeKind::Backbone => "backbone",
            TypeKind::Complex => "complex",
            TypeKind::Abstract => "abstract",
        }
    }
}

/// Scalar/array part of a cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Scalar,
    Array,
}

/// One member of a choice group, e.g. `deceasedBoolean`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceMember {
    /// Full JSON property name (`deceasedBoolean`)
    pub property: String,
    /// Type suffix as it appears in the property name (`Boolean`)
    pub suffix: String,
    /// FHIR type name the member holds (`boolean`)
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A `[x]` element: mutually exclusive properties sharing one logical slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceGroup {
    /// Logical name without the `[x]` marker (`deceased`)
    pub id: String,
    pub members: Vec<ChoiceMember>,
}

impl ChoiceGroup {
    /// Expands `id` and its allowed types into members, following the
    /// `value{Type}` naming convention.
    pub fn new(id: impl Into<String>, types: &[String]) -> Self {
        let id = id.into();
        let members = types
            .iter()
            .map(|type_name| {
                let suffix = type_suffix(type_name);
                ChoiceMember {
                    property: format!("{id}{suffix}"),
                    suffix,
                    type_name: type_name.clone(),
                }
            })
            .collect();
        Self { id, members }
    }

    pub fn member(&self, property: &str) -> Option<&ChoiceMember> {
        self.members.iter().find(|m| m.property == property)
    }

    pub fn member_suffixes(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.suffix.as_str()).collect()
    }

    /// Suffix of `property` when it is spelled like a member of this group
    /// (`deceasedString` -> `String`), whether or not the suffix is allowed.
    pub fn suffix_of<'a>(&self, property: &'a str) -> Option<&'a str> {
        let suffix = property.strip_prefix(self.id.as_str())?;
        suffix
            .chars()
            .next()
            .filter(|c| c.is_ascii_uppercase())
            .map(|_| suffix)
    }
}

/// Capitalizes the first character of a type name (`dateTime` -> `DateTime`).
pub fn type_suffix(type_name: &str) -> String {
    let mut chars = type_name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A declared property of a catalog type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// Property name; choice groups keep their `[x]` marker (`value[x]`)
    pub name: String,
    pub min: u32,
    /// Upper bound for array entries; `None` means unbounded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    pub shape: Shape,
    /// Accepted type names; for choice groups, the member types in order
    #[serde(rename = "expectedTypes")]
    pub expected_types: Vec<String>,
    #[serde(rename = "choiceGroup", skip_serializing_if = "Option::is_none")]
    pub choice_group: Option<ChoiceGroup>,
}

impl SchemaEntry {
    pub fn is_required(&self) -> bool {
        self.min > 0
    }

    pub fn is_array(&self) -> bool {
        self.shape == Shape::Array
    }

    pub fn is_choice(&self) -> bool {
        self.choice_group.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_suffix() {
        assert_eq!(type_suffix("string"), "String");
        assert_eq!(type_suffix("dateTime"), "DateTime");
        assert_eq!(type_suffix("CodeableConcept"), "CodeableConcept");
        assert_eq!(type_suffix(""), "");
    }

    #[test]
    fn test_choice_group_expansion() {
        let group = ChoiceGroup::new("deceased", &["boolean".into(), "dateTime".into()]);
        assert_eq!(group.members.len(), 2);
        assert_eq!(group.members[0].property, "deceasedBoolean");
        assert_eq!(group.members[1].property, "deceasedDateTime");
        assert_eq!(group.members[1].type_name, "dateTime");
        assert_eq!(group.member_suffixes(), vec!["Boolean", "DateTime"]);
        assert!(group.member("deceasedString").is_none());
    }

    #[test]
    fn test_suffix_of() {
        let group = ChoiceGroup::new("value", &["string".into()]);
        assert_eq!(group.suffix_of("valueString"), Some("String"));
        assert_eq!(group.suffix_of("valueQuantity"), Some("Quantity"));
        assert_eq!(group.suffix_of("valued"), None);
        assert_eq!(group.suffix_of("value"), None);
        assert_eq!(group.suffix_of("other"), None);
    }
}
