//! TOML-based engine configuration: phase catalogs and the cross-entity gate.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ids::PhaseId;

/// Top-level engine configuration parsed from TOML.
///
/// Load from TOML with [`EngineConfig::from_toml_file`] or use
/// [`EngineConfig::builtin`] for the default community and plant catalogs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Community-level phases, in workflow order.
    pub community_phases: Vec<PhaseConfig>,
    /// Plant-level phases, in workflow order.
    pub plant_phases: Vec<PhaseConfig>,
    /// Community phase that waits on every owned plant.
    #[serde(default)]
    pub cross_entity_gate: Option<CrossEntityGateConfig>,
}

/// One phase of a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseConfig {
    /// Phase identifier, unique within its catalog.
    pub id: PhaseId,
    /// Human-readable phase name.
    pub name: String,
    /// Phase whose documents must all be approved before this one can be
    /// put in review or done.
    #[serde(default)]
    pub prerequisite: Option<PhaseId>,
}

/// Links a community phase to the plant phase every owned plant must clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrossEntityGateConfig {
    /// Community phase that waits on the plants.
    pub community_phase: PhaseId,
    /// Plant phase each owned plant must clear.
    pub plant_phase: PhaseId,
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"plant_phases[2].prerequisite"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn chain(names: &[(&str, &str)]) -> Vec<PhaseConfig> {
    names
        .iter()
        .enumerate()
        .map(|(i, (id, name))| PhaseConfig {
            id: PhaseId::new(*id),
            name: (*name).to_string(),
            prerequisite: i.checked_sub(1).map(|prev| PhaseId::new(names[prev].0)),
        })
        .collect()
}

impl EngineConfig {
    /// Default catalogs: community phases `0`-`6` and plant phases
    /// `P0`-`P4`, each requiring its predecessor; community phase `3` waits
    /// on plant phase `P3` of every owned plant.
    pub fn builtin() -> Self {
        Self {
            community_phases: chain(&[
                ("0", "Promoter onboarding"),
                ("1", "Legal entity constitution"),
                ("2", "Statute and internal regulation"),
                ("3", "Per-plant energy split finalization"),
                ("4", "GSE access application"),
                ("5", "Incentive agreement"),
                ("6", "Operation and annual reporting"),
            ]),
            plant_phases: chain(&[
                ("P0", "Plant survey"),
                ("P1", "Grid connection request"),
                ("P2", "Technical documentation"),
                ("P3", "Energy split configuration"),
                ("P4", "Commissioning"),
            ]),
            cross_entity_gate: Some(CrossEntityGateConfig {
                community_phase: PhaseId::new("3"),
                plant_phase: PhaseId::new("P3"),
            }),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        validate_catalog("community_phases", &self.community_phases, &mut errors);
        validate_catalog("plant_phases", &self.plant_phases, &mut errors);

        if let Some(gate) = &self.cross_entity_gate {
            if !self.community_phases.iter().any(|p| p.id == gate.community_phase) {
                errors.push(ConfigError::new(
                    "cross_entity_gate.community_phase",
                    format!("\"{}\" is not a community phase", gate.community_phase),
                ));
            }
            match self.plant_phases.iter().find(|p| p.id == gate.plant_phase) {
                None => errors.push(ConfigError::new(
                    "cross_entity_gate.plant_phase",
                    format!("\"{}\" is not a plant phase", gate.plant_phase),
                )),
                Some(p) if p.prerequisite.is_none() => errors.push(ConfigError::new(
                    "cross_entity_gate.plant_phase",
                    format!("\"{}\" declares no prerequisite to fall back on", gate.plant_phase),
                )),
                Some(_) => {}
            }
        }

        errors
    }
}

fn validate_catalog(name: &str, phases: &[PhaseConfig], errors: &mut Vec<ConfigError>) {
    if phases.is_empty() {
        errors.push(ConfigError::new(name, "must declare at least one phase"));
        return;
    }

    let mut seen = HashSet::new();
    for (i, phase) in phases.iter().enumerate() {
        if phase.id.as_str().is_empty() {
            errors.push(ConfigError::new(format!("{name}[{i}].id"), "must not be empty"));
        }
        if !seen.insert(&phase.id) {
            errors.push(ConfigError::new(
                format!("{name}[{i}].id"),
                format!("duplicate phase id \"{}\"", phase.id),
            ));
        }
        if let Some(prereq) = &phase.prerequisite {
            // `seen` holds this phase and the ones declared before it.
            if prereq == &phase.id || !seen.contains(prereq) {
                errors.push(ConfigError::new(
                    format!("{name}[{i}].prerequisite"),
                    format!("\"{prereq}\" must be a phase declared earlier in {name}"),
                ));
            }
        }
    }
}
