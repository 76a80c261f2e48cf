use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::allocation::types::{Allocation, Plant};
use crate::error::{EngineError, EngineResult};
use crate::ids::{CommunityId, Period, PhaseId, PlantId};
use crate::workflow::types::EntityRef;

use super::{AllocationStore, Document, DocumentLedger, DocumentStatus, PlantDirectory};

/// Availability switch so tests can simulate an unreachable backend.
#[derive(Debug)]
pub(crate) struct Availability(AtomicBool);

impl Availability {
    pub(crate) fn new() -> Self {
        Self(AtomicBool::new(true))
    }

    pub(crate) fn set(&self, available: bool) {
        self.0.store(available, Ordering::SeqCst);
    }

    pub(crate) fn check(&self, store: &str) -> EngineResult<()> {
        if self.0.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EngineError::store(format!("{store} is not reachable")))
        }
    }
}

/// Document ledger held in memory, keyed by (entity, phase).
#[derive(Debug)]
pub struct InMemoryDocuments {
    docs: RwLock<HashMap<(EntityRef, PhaseId), Vec<Document>>>,
    available: Availability,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            available: Availability::new(),
        }
    }

    /// Adds a document, replacing one with the same id under the same key.
    pub async fn insert(&self, entity: EntityRef, phase: PhaseId, doc: Document) {
        let mut docs = self.docs.write().await;
        let list = docs.entry((entity, phase)).or_default();
        list.retain(|d| d.id != doc.id);
        list.push(doc);
    }

    /// Changes the status of every document with `id` under the key.
    ///
    /// Returns `false` if no such document exists.
    pub async fn set_status(
        &self,
        entity: &EntityRef,
        phase: &PhaseId,
        id: &str,
        status: DocumentStatus,
    ) -> bool {
        let mut docs = self.docs.write().await;
        let Some(list) = docs.get_mut(&(entity.clone(), phase.clone())) else {
            return false;
        };
        let mut found = false;
        for doc in list.iter_mut().filter(|d| d.id.as_str() == id) {
            doc.status = status;
            found = true;
        }
        found
    }

    /// Toggles simulated reachability.
    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }
}

impl Default for InMemoryDocuments {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentLedger for InMemoryDocuments {
    async fn list_documents(
        &self,
        entity: &EntityRef,
        phase: &PhaseId,
    ) -> EngineResult<Vec<Document>> {
        self.available.check("document ledger")?;
        let docs = self.docs.read().await;
        Ok(docs
            .get(&(entity.clone(), phase.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Plant registry held in memory.
#[derive(Debug)]
pub struct InMemoryPlants {
    plants: RwLock<Vec<Plant>>,
    available: Availability,
}

impl InMemoryPlants {
    pub fn new(plants: Vec<Plant>) -> Self {
        Self {
            plants: RwLock::new(plants),
            available: Availability::new(),
        }
    }

    pub async fn insert(&self, plant: Plant) {
        let mut plants = self.plants.write().await;
        plants.retain(|p| p.id != plant.id);
        plants.push(plant);
    }

    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }
}

impl Default for InMemoryPlants {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl PlantDirectory for InMemoryPlants {
    async fn list_plants(&self, community: &CommunityId) -> EngineResult<Vec<Plant>> {
        self.available.check("plant registry")?;
        let plants = self.plants.read().await;
        Ok(plants
            .iter()
            .filter(|p| &p.community_id == community)
            .cloned()
            .collect())
    }
}

/// Allocation records held in memory, keyed by (plant, period).
#[derive(Debug)]
pub struct InMemoryAllocations {
    records: RwLock<BTreeMap<(PlantId, Period), Allocation>>,
    available: Availability,
}

impl InMemoryAllocations {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            available: Availability::new(),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Default for InMemoryAllocations {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AllocationStore for InMemoryAllocations {
    async fn get(&self, plant: &PlantId, period: &Period) -> EngineResult<Option<Allocation>> {
        self.available.check("allocation store")?;
        let records = self.records.read().await;
        Ok(records.get(&(plant.clone(), period.clone())).cloned())
    }

    async fn get_or_create(&self, plant: &PlantId, period: &Period) -> EngineResult<Allocation> {
        self.available.check("allocation store")?;
        let mut records = self.records.write().await;
        let record = records
            .entry((plant.clone(), period.clone()))
            .or_insert_with(|| Allocation::empty(plant.clone(), period.clone()));
        Ok(record.clone())
    }

    async fn save(&self, allocation: Allocation) -> EngineResult<()> {
        self.available.check("allocation store")?;
        let mut records = self.records.write().await;
        records.insert(
            (allocation.plant_id.clone(), allocation.period.clone()),
            allocation,
        );
        Ok(())
    }

    async fn save_all(&self, allocations: Vec<Allocation>) -> EngineResult<()> {
        self.available.check("allocation store")?;
        let mut records = self.records.write().await;
        for allocation in allocations {
            records.insert(
                (allocation.plant_id.clone(), allocation.period.clone()),
                allocation,
            );
        }
        Ok(())
    }
}
