//! Schema catalogs compiled into the crate.
//!
//! Datatypes and most resources are shared between versions; R4 and R4B use
//! the same Observation definition while R5 carries its own.

use crate::catalog::{CatalogDocument, SchemaCatalog};
use crate::config::FhirVersion;
use crate::error::{Result, YafvError};
use once_cell::sync::Lazy;
use std::sync::Arc;

pub static BASE_TYPES: &str = include_str!("../schemas/common/base.json");
pub static DATATYPES: &str = include_str!("../schemas/common/datatypes.json");
pub static COMMON_RESOURCES: &str = include_str!("../schemas/common/resources.json");
pub static R4_OBSERVATION: &str = include_str!("../schemas/r4/observation.json");
pub static R5_OBSERVATION: &str = include_str!("../schemas/r5/observation.json");

type CatalogSlot = Lazy<std::result::Result<Arc<SchemaCatalog>, String>>;

static R4_CATALOG: CatalogSlot = Lazy::new(|| build_slot(FhirVersion::R4));
static R4B_CATALOG: CatalogSlot = Lazy::new(|| build_slot(FhirVersion::R4B));
static R5_CATALOG: CatalogSlot = Lazy::new(|| build_slot(FhirVersion::R5));

fn sources(version: FhirVersion) -> [&'static str; 4] {
    let observation = match version {
        FhirVersion::R4 | FhirVersion::R4B => R4_OBSERVATION,
        FhirVersion::R5 => R5_OBSERVATION,
    };
    [BASE_TYPES, DATATYPES, COMMON_RESOURCES, observation]
}

/// Parses the embedded documents of `version` into a fresh catalog.
pub fn build_catalog(version: FhirVersion) -> Result<SchemaCatalog> {
    let mut documents = Vec::with_capacity(5);
    documents.push(CatalogDocument {
        fhir_version: Some(version.package_version().to_string()),
        ..Default::default()
    });
    for source in sources(version) {
        documents.push(CatalogDocument::from_json_str(source)?);
    }
    SchemaCatalog::from_documents(documents)
}

fn build_slot(version: FhirVersion) -> std::result::Result<Arc<SchemaCatalog>, String> {
    build_catalog(version).map(Arc::new).map_err(|e| {
        tracing::error!("Failed to build embedded {} catalog: {}", version.short_name(), e);
        e.to_string()
    })
}

/// Shared embedded catalog of `version`, built on first use.
pub fn catalog(version: FhirVersion) -> Result<Arc<SchemaCatalog>> {
    let slot = match version {
        FhirVersion::R4 => &R4_CATALOG,
        FhirVersion::R4B => &R4B_CATALOG,
        FhirVersion::R5 => &R5_CATALOG,
    };
    slot.as_ref()
        .map(Arc::clone)
        .map_err(|message| YafvError::invalid_catalog(message.clone()))
}

/// Check if a type exists in the embedded catalog of a version
pub fn has_type(version: FhirVersion, type_name: &str) -> bool {
    catalog(version).is_ok_and(|catalog| catalog.contains(type_name))
}
