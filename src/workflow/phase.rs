//! Immutable phase catalogs for community and plant workflows.

use crate::config::{ConfigError, EngineConfig, PhaseConfig};
use crate::error::{EngineError, EngineResult};
use crate::ids::PhaseId;

use super::types::EntityType;

/// Sort order reported for phases missing from a catalog.
///
/// Unknown phases sort after every known one instead of failing lookups.
pub const UNKNOWN_ORDER: u32 = u32::MAX;

/// A phase with its position and optional prerequisite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseDefinition {
    /// Phase identifier.
    pub id: PhaseId,
    /// Human-readable phase name.
    pub name: String,
    /// Zero-based position in the catalog.
    pub order: u32,
    /// Phase whose documents must be approved first.
    pub prerequisite: Option<PhaseId>,
}

/// Ordered list of phases for one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseCatalog {
    phases: Vec<PhaseDefinition>,
}

impl PhaseCatalog {
    fn from_config(phases: &[PhaseConfig]) -> Self {
        Self {
            phases: phases
                .iter()
                .zip(0u32..)
                .map(|(p, order)| PhaseDefinition {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    order,
                    prerequisite: p.prerequisite.clone(),
                })
                .collect(),
        }
    }

    pub fn get(&self, id: &PhaseId) -> Option<&PhaseDefinition> {
        self.phases.iter().find(|p| &p.id == id)
    }

    /// Position of `id`, or [`UNKNOWN_ORDER`].
    pub fn order(&self, id: &PhaseId) -> u32 {
        self.get(id).map_or(UNKNOWN_ORDER, |p| p.order)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhaseDefinition> {
        self.phases.iter()
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

/// Community phase that waits on an analogous phase of every owned plant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossEntityRule {
    /// Community phase gated on owned plants.
    pub community_phase: PhaseId,
    /// Plant phase each owned plant must clear.
    pub plant_phase: PhaseId,
    /// Prerequisite of `plant_phase`; its documents are the fallback check.
    pub plant_prerequisite: PhaseId,
}

/// Both catalogs plus the cross-entity rule, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseRegistry {
    community: PhaseCatalog,
    plant: PhaseCatalog,
    cross_entity: Option<CrossEntityRule>,
}

impl PhaseRegistry {
    /// Builds the registry from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns every validation error of `config`.
    pub fn from_config(config: &EngineConfig) -> Result<Self, Vec<ConfigError>> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self::assemble(config))
    }

    /// Registry with the default catalogs.
    pub fn builtin() -> Self {
        Self::assemble(&EngineConfig::builtin())
    }

    fn assemble(config: &EngineConfig) -> Self {
        let community = PhaseCatalog::from_config(&config.community_phases);
        let plant = PhaseCatalog::from_config(&config.plant_phases);
        let cross_entity = config.cross_entity_gate.as_ref().and_then(|gate| {
            let prerequisite = plant.get(&gate.plant_phase)?.prerequisite.clone()?;
            Some(CrossEntityRule {
                community_phase: gate.community_phase.clone(),
                plant_phase: gate.plant_phase.clone(),
                plant_prerequisite: prerequisite,
            })
        });

        Self {
            community,
            plant,
            cross_entity,
        }
    }

    pub fn catalog(&self, entity_type: EntityType) -> &PhaseCatalog {
        match entity_type {
            EntityType::Community => &self.community,
            EntityType::Plant => &self.plant,
        }
    }

    /// Position of a phase within its catalog, or [`UNKNOWN_ORDER`].
    pub fn order(&self, entity_type: EntityType, phase: &PhaseId) -> u32 {
        self.catalog(entity_type).order(phase)
    }

    /// Looks a phase up, failing with `UnknownPhase`.
    pub fn phase(&self, entity_type: EntityType, phase: &PhaseId) -> EngineResult<&PhaseDefinition> {
        self.catalog(entity_type)
            .get(phase)
            .ok_or_else(|| EngineError::UnknownPhase {
                entity_type,
                phase: phase.clone(),
            })
    }

    pub fn cross_entity(&self) -> Option<&CrossEntityRule> {
        self.cross_entity.as_ref()
    }
}
