//! Engine facade wiring the registry, collaborators and services together.

use std::sync::Arc;

use crate::allocation::run::{CalculationRun, RunReport};
use crate::dataset::Dataset;
use crate::error::EngineResult;
use crate::ids::{CommunityId, Period};
use crate::ledger::{
    AllocationStore, DocumentLedger, InMemoryAllocations, InMemoryDocuments, InMemoryPlants,
    PlantDirectory,
};
use crate::workflow::clock::{Clock, SystemClock};
use crate::workflow::gate::{GateEvaluator, PhaseProgress};
use crate::workflow::phase::PhaseRegistry;
use crate::workflow::store::{InMemoryWorkflowStore, WorkflowStore};
use crate::workflow::types::{EntityRef, Status, WorkflowEntry, WorkflowKey, WorkflowPatch};

/// Entry point for the allocation and workflow operations.
///
/// Cheap to clone; every component is shared by `Arc`.
#[derive(Clone)]
pub struct Engine {
    registry: Arc<PhaseRegistry>,
    gate: GateEvaluator,
    runs: CalculationRun,
}

impl Engine {
    pub fn new(
        registry: Arc<PhaseRegistry>,
        plants: Arc<dyn PlantDirectory>,
        allocations: Arc<dyn AllocationStore>,
        documents: Arc<dyn DocumentLedger>,
        workflow: Arc<dyn WorkflowStore>,
    ) -> Self {
        let gate = GateEvaluator::new(registry.clone(), workflow, documents, plants.clone());
        let runs = CalculationRun::new(plants, allocations);
        Self {
            registry,
            gate,
            runs,
        }
    }

    pub fn registry(&self) -> &PhaseRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &GateEvaluator {
        &self.gate
    }

    /// See [`GateEvaluator::advance`].
    pub async fn advance(
        &self,
        key: &WorkflowKey,
        target: Status,
        patch: WorkflowPatch,
    ) -> EngineResult<WorkflowEntry> {
        self.gate.advance(key, target, patch).await
    }

    /// See [`GateEvaluator::overview`].
    pub async fn overview(&self, entity: &EntityRef) -> EngineResult<Vec<PhaseProgress>> {
        self.gate.overview(entity).await
    }

    /// See [`CalculationRun::execute`].
    pub async fn run(
        &self,
        community: &CommunityId,
        period: &Period,
        confirm: bool,
    ) -> EngineResult<RunReport> {
        self.runs.execute(community, period, confirm).await
    }
}

/// In-memory collaborators, kept concrete so callers can seed them and
/// toggle their availability.
#[derive(Clone)]
pub struct InMemoryBackend {
    pub plants: Arc<InMemoryPlants>,
    pub allocations: Arc<InMemoryAllocations>,
    pub documents: Arc<InMemoryDocuments>,
    pub workflow: Arc<InMemoryWorkflowStore>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            plants: Arc::new(InMemoryPlants::default()),
            allocations: Arc::new(InMemoryAllocations::new()),
            documents: Arc::new(InMemoryDocuments::new()),
            workflow: Arc::new(InMemoryWorkflowStore::with_clock(clock)),
        }
    }

    /// Loads every record of `dataset`. Workflow entries are written as
    /// given, without gate checks.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if a collaborator has been switched off.
    pub async fn seed(&self, dataset: &Dataset) -> EngineResult<()> {
        for plant in &dataset.plants {
            self.plants.insert(plant.clone()).await;
        }
        for allocation in &dataset.allocations {
            self.allocations.save(allocation.clone()).await?;
        }
        for record in &dataset.documents {
            self.documents
                .insert(record.entity(), record.phase.clone(), record.document())
                .await;
        }
        for record in &dataset.workflow {
            self.workflow.upsert(&record.key(), &record.patch).await?;
        }
        Ok(())
    }

    pub fn engine(&self, registry: Arc<PhaseRegistry>) -> Engine {
        Engine::new(
            registry,
            self.plants.clone(),
            self.allocations.clone(),
            self.documents.clone(),
            self.workflow.clone(),
        )
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}
