//! External collaborators consumed by the engine.
//!
//! The document ledger, plant enumeration and allocation persistence are
//! owned by other parts of the back office. The engine only sees these
//! traits; failures in an implementation surface as
//! [`EngineError::StoreUnavailable`](crate::error::EngineError::StoreUnavailable).

/// In-memory implementations for tests, the CLI and the demo API.
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::allocation::types::{Allocation, Plant};
use crate::error::EngineResult;
use crate::ids::{CommunityId, DocumentId, Period, PhaseId, PlantId};
use crate::workflow::types::EntityRef;

pub use memory::{InMemoryAllocations, InMemoryDocuments, InMemoryPlants};

/// Review status of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    Approved,
    Rejected,
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uploaded => "uploaded",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A document tagged with an entity and a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// Name shown to reviewers.
    pub name: String,
    pub status: DocumentStatus,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, name: impl Into<String>, status: DocumentStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == DocumentStatus::Approved
    }
}

/// Lists documents tied to an entity's phase.
#[async_trait]
pub trait DocumentLedger: Send + Sync {
    async fn list_documents(&self, entity: &EntityRef, phase: &PhaseId)
    -> EngineResult<Vec<Document>>;
}

/// Enumerates the plants owned by a community.
#[async_trait]
pub trait PlantDirectory: Send + Sync {
    async fn list_plants(&self, community: &CommunityId) -> EngineResult<Vec<Plant>>;
}

/// Read/write contract for allocation records keyed by (plant, period).
#[async_trait]
pub trait AllocationStore: Send + Sync {
    async fn get(&self, plant: &PlantId, period: &Period) -> EngineResult<Option<Allocation>>;

    /// Returns the record, creating the zero-energy, empty-weights record
    /// on first reference.
    async fn get_or_create(&self, plant: &PlantId, period: &Period) -> EngineResult<Allocation>;

    async fn save(&self, allocation: Allocation) -> EngineResult<()>;

    /// Writes every record or none of them.
    async fn save_all(&self, allocations: Vec<Allocation>) -> EngineResult<()>;
}
