//! Community phase gated on the progress of every owned plant.

use tracing::debug;

use crate::error::{EngineResult, PlantShortfall};
use crate::ids::CommunityId;
use crate::ledger::{DocumentLedger, PlantDirectory};

use super::gate::document_shortfall;
use super::phase::CrossEntityRule;
use super::store::WorkflowStore;
use super::types::{EntityRef, Status, WorkflowKey};

/// Plants of `community` that have not cleared `rule.plant_phase`.
///
/// A plant clears it when its entry for that phase is `done`, or when every
/// document of the phase's prerequisite is approved. A community that owns
/// no plants has nothing blocking it.
///
/// # Errors
///
/// `StoreUnavailable` if the plant directory, workflow store or ledger
/// cannot be read.
pub async fn blocking_plants(
    community: &CommunityId,
    rule: &CrossEntityRule,
    plants: &dyn PlantDirectory,
    store: &dyn WorkflowStore,
    documents: &dyn DocumentLedger,
) -> EngineResult<Vec<PlantShortfall>> {
    let mut blocking = Vec::new();
    for plant in plants.list_plants(community).await? {
        let entity = EntityRef::Plant(plant.id.clone());
        let key = WorkflowKey::new(entity.clone(), rule.plant_phase.clone());
        if store
            .get(&key)
            .await?
            .is_some_and(|entry| entry.status == Status::Done)
        {
            continue;
        }

        if let Some(shortfall) =
            document_shortfall(documents, &entity, &rule.plant_prerequisite).await?
        {
            debug!(plant = %plant.id, outstanding = shortfall.outstanding.len(), "plant blocks community");
            blocking.push(PlantShortfall {
                plant_id: plant.id,
                shortfall,
            });
        }
    }
    Ok(blocking)
}
