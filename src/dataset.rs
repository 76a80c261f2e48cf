//! TOML datasets that seed the in-memory collaborators.
//!
//! A dataset carries plants, per-period allocations, documents and workflow
//! entries. The CLI loads one from a file or a built-in preset; integration
//! tests use the `demo` preset.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::allocation::types::{Allocation, Plant};
use crate::config::ConfigError;
use crate::ids::{DocumentId, PhaseId, PlantId};
use crate::ledger::{Document, DocumentStatus};
use crate::workflow::phase::PhaseRegistry;
use crate::workflow::types::{EntityRef, EntityType, WorkflowKey, WorkflowPatch};

const DEMO: &str = include_str!("../datasets/demo.toml");

/// Plants, allocations, documents and workflow entries of a back office.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dataset {
    #[serde(default)]
    pub plants: Vec<Plant>,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
    #[serde(default)]
    pub workflow: Vec<WorkflowRecord>,
}

/// A document attached to an entity's phase.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentRecord {
    /// Kind of entity the document belongs to.
    pub entity_type: EntityType,
    /// Community or plant identifier.
    pub entity_id: String,
    /// Phase the document is filed under.
    pub phase: PhaseId,
    pub id: DocumentId,
    pub name: String,
    /// Review status at load time.
    pub status: DocumentStatus,
}

impl DocumentRecord {
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.entity_type, self.entity_id.clone())
    }

    pub fn document(&self) -> Document {
        Document::new(self.id.clone(), self.name.clone(), self.status)
    }
}

/// A stored workflow entry, loaded without gate checks.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkflowRecord {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub phase: PhaseId,
    #[serde(flatten)]
    pub patch: WorkflowPatch,
}

impl WorkflowRecord {
    pub fn key(&self) -> WorkflowKey {
        WorkflowKey::new(
            EntityRef::new(self.entity_type, self.entity_id.clone()),
            self.phase.clone(),
        )
    }
}

impl Dataset {
    /// Parses a dataset from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("dataset", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a dataset from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Returns a built-in dataset by name.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is not recognized.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "demo" => Self::from_toml_str(DEMO),
            "empty" => Ok(Self::default()),
            _ => Err(ConfigError::new(
                "preset",
                format!("unknown preset \"{name}\", expected one of: demo, empty"),
            )),
        }
    }

    pub fn plant(&self, id: &PlantId) -> Option<&Plant> {
        self.plants.iter().find(|p| &p.id == id)
    }

    /// Checks references against the plant list and the phase catalogs.
    ///
    /// Returns an empty vector if the dataset is consistent.
    pub fn validate(&self, registry: &PhaseRegistry) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        for (i, a) in self.allocations.iter().enumerate() {
            if self.plant(&a.plant_id).is_none() {
                errors.push(ConfigError::new(
                    format!("allocations[{i}].plant_id"),
                    format!("unknown plant \"{}\"", a.plant_id),
                ));
            }
        }

        let refs = self
            .documents
            .iter()
            .map(|d| (d.entity_type, d.entity_id.as_str(), &d.phase))
            .enumerate()
            .map(|(i, r)| (format!("documents[{i}]"), r));
        let workflow = self
            .workflow
            .iter()
            .map(|w| (w.entity_type, w.entity_id.as_str(), &w.phase))
            .enumerate()
            .map(|(i, r)| (format!("workflow[{i}]"), r));

        for (field, (entity_type, entity_id, phase)) in refs.chain(workflow) {
            if entity_type == EntityType::Plant && self.plant(&PlantId::new(entity_id)).is_none() {
                errors.push(ConfigError::new(
                    format!("{field}.entity_id"),
                    format!("unknown plant \"{entity_id}\""),
                ));
            }
            if registry.catalog(entity_type).get(phase).is_none() {
                errors.push(ConfigError::new(
                    format!("{field}.phase"),
                    format!("\"{phase}\" is not a {entity_type} phase"),
                ));
            }
        }

        errors
    }
}
