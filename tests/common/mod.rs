//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use cer_engine::allocation::types::{Allocation, Plant, WeightEntry};
use cer_engine::dataset::Dataset;
use cer_engine::engine::{Engine, InMemoryBackend};
use cer_engine::ids::{CommunityId, Period, PlantId};
use cer_engine::workflow::clock::ManualClock;
use cer_engine::workflow::phase::PhaseRegistry;

/// Period used by the demo dataset.
pub const PERIOD: &str = "2024-03";

/// Typology-A plant with a 45/55 split.
pub fn plant_a(id: &str) -> Plant {
    Plant {
        id: PlantId::new(id),
        community_id: CommunityId::new("CER-1"),
        typology: "A".to_string(),
        pct_shared: 45.0,
        pct_other: 55.0,
    }
}

/// Typology-B plant with a 70/30 split.
pub fn plant_b(id: &str) -> Plant {
    Plant {
        typology: "B".to_string(),
        pct_shared: 70.0,
        pct_other: 30.0,
        ..plant_a(id)
    }
}

/// Allocation of `energy` kWh with the given consumer and benefit weights.
///
/// Benefit weights go to producers for `A` plants and prosumers for `B`.
pub fn allocation(
    plant: &Plant,
    energy: f64,
    consumers: &[(&str, f64)],
    benefit: &[(&str, f64)],
) -> Allocation {
    let mut a = Allocation::empty(plant.id.clone(), Period::new(PERIOD));
    a.energy_shared_kwh = energy;
    a.weights.consumers = consumers.iter().map(|(m, b)| WeightEntry::new(*m, *b)).collect();
    let benefit: Vec<WeightEntry> = benefit.iter().map(|(m, b)| WeightEntry::new(*m, *b)).collect();
    if plant.typology == "B" {
        a.weights.prosumers = benefit;
    } else {
        a.weights.producers = benefit;
    }
    a
}

/// Manual clock frozen at 2024-03-01 09:00 UTC.
pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    ))
}

/// Backend seeded with `dataset` on a manual clock, plus an engine over it.
pub async fn seeded(dataset: &Dataset) -> (Arc<ManualClock>, InMemoryBackend, Engine) {
    let clock = manual_clock();
    let backend = InMemoryBackend::with_clock(clock.clone());
    backend.seed(dataset).await.unwrap();
    let engine = backend.engine(Arc::new(PhaseRegistry::builtin()));
    (clock, backend, engine)
}

/// Backend and engine over the built-in demo dataset.
pub async fn demo() -> (Arc<ManualClock>, InMemoryBackend, Engine) {
    let dataset = Dataset::from_preset("demo").unwrap();
    seeded(&dataset).await
}
