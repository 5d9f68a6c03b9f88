//! Choice-type (`[x]`) resolution.
//!
//! A choice group is one logical slot serialized under several type-suffixed
//! property names. The resolver works out which members an object populates;
//! type-checking the selected member is left to the orchestrator, which
//! treats it like any other scalar property.

use crate::catalog::{ChoiceGroup, ChoiceMember, SchemaEntry, TypeSchema};
use crate::path::ElementPath;
use crate::validation::outcome::{DiagnosticsBuilder, Issue};
use serde_json::{Map, Value};

/// Members of one choice group found on an object.
#[derive(Debug, Default)]
pub struct ChoiceResolution<'e, 'v> {
    /// Populated members in declaration order
    pub present: Vec<(&'e ChoiceMember, &'v Value)>,
    /// `_<member>` companions found for the group
    pub companions: Vec<(&'e ChoiceMember, &'v Value)>,
    pub issues: Vec<Issue>,
}

impl<'e, 'v> ChoiceResolution<'e, 'v> {
    /// The single populated member, if the slot is not in conflict.
    pub fn selected(&self) -> Option<(&'e ChoiceMember, &'v Value)> {
        match self.present.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

/// Name of the `_<name>` primitive extension companion of a property.
pub fn companion_name(property: &str) -> String {
    format!("_{property}")
}

fn present<'v>(object: &'v Map<String, Value>, property: &str) -> Option<&'v Value> {
    object.get(property).filter(|value| !value.is_null())
}

pub struct ChoiceResolver;

impl ChoiceResolver {
    /// Resolves the group declared by `entry` on `object` located at `path`.
    pub fn resolve<'e, 'v>(
        object: &'v Map<String, Value>,
        entry: &'e SchemaEntry,
        group: &'e ChoiceGroup,
        path: &ElementPath,
    ) -> ChoiceResolution<'e, 'v> {
        let mut resolution = ChoiceResolution::default();

        for member in &group.members {
            if let Some(value) = present(object, &member.property) {
                resolution.present.push((member, value));
            }
            if let Some(companion) = present(object, &companion_name(&member.property)) {
                resolution.companions.push((member, companion));
            }
        }

        if resolution.present.len() > 1 {
            let conflicting: Vec<(&str, ElementPath)> = resolution
                .present
                .iter()
                .map(|(member, _)| (member.property.as_str(), path.field(member.property.as_str())))
                .collect();
            resolution.issues.push(DiagnosticsBuilder::conflicting_choice(
                &path.field(entry.name.as_str()),
                &conflicting,
            ));
        } else if resolution.present.is_empty() && resolution.companions.is_empty() && entry.is_required() {
            let members: Vec<&str> = group.members.iter().map(|m| m.property.as_str()).collect();
            resolution.issues.push(DiagnosticsBuilder::missing_required_choice(
                &path.field(entry.name.as_str()),
                &members,
            ));
        }

        resolution
    }

    /// Finds the choice group an undeclared property is spelled after, e.g.
    /// `deceasedString` on a type whose `deceased[x]` does not allow `string`.
    pub fn misnamed_member<'s, 'p>(
        schema: &'s TypeSchema,
        property: &'p str,
    ) -> Option<(&'s ChoiceGroup, &'p str)> {
        schema
            .choice_groups()
            .filter(|(_, group)| group.member(property).is_none())
            .find_map(|(_, group)| group.suffix_of(property).map(|suffix| (group, suffix)))
    }

    pub fn invalid_suffix_issue(path: &ElementPath, group: &ChoiceGroup, suffix: &str) -> Issue {
        DiagnosticsBuilder::invalid_choice_suffix(
            path,
            &format!("{}[x]", group.id),
            suffix,
            &group.member_suffixes(),
        )
    }
}
