//! Error taxonomy for the allocation engine and the workflow gates.
//!
//! Every failure carries a machine-readable [`ErrorKind`], a human-readable
//! message (the `Display` impl) and, for gate failures, structured
//! [`GateDetails`] naming exactly which documents are outstanding.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::allocation::types::Role;
use crate::ids::{DocumentId, PhaseId, PlantId};
use crate::ledger::DocumentStatus;
use crate::workflow::types::{EntityRef, EntityType, Status};

/// Machine-readable error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    InsufficientBasis,
    InvalidTransition,
    UnknownPhase,
    GateNotMet,
    StoreUnavailable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Configuration => "configuration",
            Self::InsufficientBasis => "insufficient_basis",
            Self::InvalidTransition => "invalid_transition",
            Self::UnknownPhase => "unknown_phase",
            Self::GateNotMet => "gate_not_met",
            Self::StoreUnavailable => "store_unavailable",
        };
        f.write_str(s)
    }
}

/// Errors raised by splits, aggregation runs and workflow advances.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Bad plant or allocation input: percentages, negative values, mismatched ids.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("configuration error: plant {plant} has unrecognized typology \"{typology}\"")]
    InvalidTypology { plant: PlantId, typology: String },

    /// Energy is owed to a group whose basis sums to zero.
    #[error(
        "insufficient basis: plant {plant} owes {owed_kwh:.3} kWh to {role}s but their basis sums to 0"
    )]
    InsufficientBasis {
        plant: PlantId,
        role: Role,
        owed_kwh: f64,
    },

    #[error("invalid transition for {entity} phase {phase}: {from} -> {to}")]
    InvalidTransition {
        entity: EntityRef,
        phase: PhaseId,
        from: Status,
        to: Status,
    },

    #[error("unknown {entity_type} phase {phase}")]
    UnknownPhase {
        entity_type: EntityType,
        phase: PhaseId,
    },

    #[error("gate not met for {entity} phase {phase}: {details}")]
    GateNotMet {
        entity: EntityRef,
        phase: PhaseId,
        details: GateDetails,
    },

    /// Transport or persistence failure in an external collaborator.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl EngineError {
    /// Returns the machine-readable kind of this error.
    ///
    /// `InvalidTypology` is a configuration problem and reports as such.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::InvalidTypology { .. } => ErrorKind::Configuration,
            Self::InsufficientBasis { .. } => ErrorKind::InsufficientBasis,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::UnknownPhase { .. } => ErrorKind::UnknownPhase,
            Self::GateNotMet { .. } => ErrorKind::GateNotMet,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Structured details, present only for gate failures.
    pub fn details(&self) -> Option<&GateDetails> {
        match self {
            Self::GateNotMet { details, .. } => Some(details),
            _ => None,
        }
    }

    /// Whether a caller may retry the operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    pub(crate) fn store(err: impl fmt::Display) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

/// A document that keeps a gate closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutstandingDocument {
    /// Document identifier.
    pub id: DocumentId,
    /// Document name as uploaded.
    pub name: String,
    /// Current review status (never `approved`).
    pub status: DocumentStatus,
}

/// Documents still outstanding for one prerequisite phase.
///
/// An empty `outstanding` list means nothing was uploaded for the phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentShortfall {
    /// Prerequisite phase the documents belong to.
    pub phase: PhaseId,
    /// Documents not yet approved.
    pub outstanding: Vec<OutstandingDocument>,
}

impl DocumentShortfall {
    /// True when the prerequisite phase has no documents at all.
    pub fn nothing_uploaded(&self) -> bool {
        self.outstanding.is_empty()
    }
}

impl fmt::Display for DocumentShortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nothing_uploaded() {
            return write!(f, "no documents uploaded for phase {}", self.phase);
        }
        write!(f, "phase {} awaiting approval of ", self.phase)?;
        for (i, doc) in self.outstanding.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} ({}, {})", doc.name, doc.id, doc.status)?;
        }
        Ok(())
    }
}

/// Shortfall attributed to one plant owned by a community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantShortfall {
    /// Plant holding up the community phase.
    pub plant_id: PlantId,
    #[serde(flatten)]
    pub shortfall: DocumentShortfall,
}

/// Structured payload of a [`EngineError::GateNotMet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateDetails {
    /// The entity's own prerequisite documents are not all approved.
    #[serde(rename = "missingDocs")]
    MissingDocs(DocumentShortfall),
    /// One or more owned plants block a community-level phase.
    #[serde(rename = "missingByPlant")]
    MissingByPlant(Vec<PlantShortfall>),
}

impl fmt::Display for GateDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDocs(shortfall) => write!(f, "{shortfall}"),
            Self::MissingByPlant(plants) => {
                write!(f, "{} plant(s) not cleared: ", plants.len())?;
                for (i, p) in plants.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "plant {}: {}", p.plant_id, p.shortfall)?;
                }
                Ok(())
            }
        }
    }
}

/// Serializable tagged error value returned across the exposed surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error kind.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Gate shortfall, present only for `gate_not_met`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<GateDetails>,
}

impl From<&EngineError> for ErrorBody {
    fn from(err: &EngineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            details: err.details().cloned(),
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
