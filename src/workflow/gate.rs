//! Gate evaluator: status-machine legality, document gates, and commit.
//!
//! A transition request is checked in three strictly sequential steps:
//!
//! 1. the status edge must be legal (see [`Status::can_transition_to`]);
//! 2. when the target is `in-review` or `done`, every [`Prerequisite`] the
//!    phase resolves to must be met;
//! 3. only then is the workflow store written.
//!
//! Any failure leaves the store untouched.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{DocumentShortfall, EngineError, EngineResult, GateDetails, OutstandingDocument};
use crate::ids::PhaseId;
use crate::ledger::{DocumentLedger, PlantDirectory};

use super::cross_entity;
use super::phase::{CrossEntityRule, PhaseRegistry};
use super::store::WorkflowStore;
use super::types::{EntityRef, EntityType, Status, WorkflowEntry, WorkflowKey, WorkflowPatch};

/// How a gated phase's precondition is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prerequisite {
    /// Every document of `phase` on the same entity must be approved.
    Documents { phase: PhaseId },
    /// Every plant owned by the community must have cleared the rule's
    /// plant phase.
    OwnedPlants(CrossEntityRule),
}

/// One row of an entity's workflow overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseProgress {
    pub phase: PhaseId,
    /// Human-readable phase name.
    pub name: String,
    /// Stored status, `todo` when no entry exists.
    pub status: Status,
    /// Stored entry, absent while the phase was never touched.
    pub entry: Option<WorkflowEntry>,
}

/// Validates and commits workflow transitions.
#[derive(Clone)]
pub struct GateEvaluator {
    registry: Arc<PhaseRegistry>,
    store: Arc<dyn WorkflowStore>,
    documents: Arc<dyn DocumentLedger>,
    plants: Arc<dyn PlantDirectory>,
}

impl GateEvaluator {
    pub fn new(
        registry: Arc<PhaseRegistry>,
        store: Arc<dyn WorkflowStore>,
        documents: Arc<dyn DocumentLedger>,
        plants: Arc<dyn PlantDirectory>,
    ) -> Self {
        Self {
            registry,
            store,
            documents,
            plants,
        }
    }

    pub fn registry(&self) -> &PhaseRegistry {
        &self.registry
    }

    /// Resolves the prerequisites of `key`'s phase, own documents first.
    ///
    /// # Errors
    ///
    /// `UnknownPhase` if the phase is not in the entity's catalog.
    pub fn prerequisites(&self, key: &WorkflowKey) -> EngineResult<Vec<Prerequisite>> {
        let entity_type = key.entity.entity_type();
        let definition = self.registry.phase(entity_type, &key.phase)?;

        let mut prerequisites = Vec::new();
        if let Some(phase) = &definition.prerequisite {
            prerequisites.push(Prerequisite::Documents {
                phase: phase.clone(),
            });
        }
        if entity_type == EntityType::Community {
            if let Some(rule) = self
                .registry
                .cross_entity()
                .filter(|rule| rule.community_phase == key.phase)
            {
                prerequisites.push(Prerequisite::OwnedPlants(rule.clone()));
            }
        }
        Ok(prerequisites)
    }

    /// Checks the gate of `key`'s phase without writing anything.
    ///
    /// # Errors
    ///
    /// `GateNotMet` with the outstanding documents of the first unmet
    /// prerequisite, `UnknownPhase`, or `StoreUnavailable`.
    pub async fn check(&self, key: &WorkflowKey) -> EngineResult<()> {
        for prerequisite in self.prerequisites(key)? {
            let details = match &prerequisite {
                Prerequisite::Documents { phase } => {
                    document_shortfall(self.documents.as_ref(), &key.entity, phase)
                        .await?
                        .map(GateDetails::MissingDocs)
                }
                Prerequisite::OwnedPlants(rule) => {
                    let EntityRef::Community(community) = &key.entity else {
                        continue;
                    };
                    let blocking = cross_entity::blocking_plants(
                        community,
                        rule,
                        self.plants.as_ref(),
                        self.store.as_ref(),
                        self.documents.as_ref(),
                    )
                    .await?;
                    (!blocking.is_empty()).then_some(GateDetails::MissingByPlant(blocking))
                }
            };

            if let Some(details) = details {
                return Err(EngineError::GateNotMet {
                    entity: key.entity.clone(),
                    phase: key.phase.clone(),
                    details,
                });
            }
        }
        Ok(())
    }

    /// Moves `key` to `target`, merging `patch` into the entry.
    ///
    /// Self-transitions are legal: they leave the status as is, still merge
    /// owner, due date and notes, and refresh `updated_at`. The gate is
    /// evaluated for every `in-review` or `done` target, self-transitions
    /// included. The status in `patch` is ignored in favor of `target`.
    ///
    /// # Errors
    ///
    /// `UnknownPhase`, `InvalidTransition`, `GateNotMet`, or
    /// `StoreUnavailable`; the store is unchanged in every case.
    #[instrument(skip_all, fields(entity = %key.entity, phase = %key.phase, target = %target))]
    pub async fn advance(
        &self,
        key: &WorkflowKey,
        target: Status,
        patch: WorkflowPatch,
    ) -> EngineResult<WorkflowEntry> {
        self.registry.phase(key.entity.entity_type(), &key.phase)?;

        let from = self
            .store
            .get(key)
            .await?
            .map(|entry| entry.status)
            .unwrap_or_default();
        if !from.can_transition_to(target) {
            debug!(%from, "illegal status edge");
            return Err(EngineError::InvalidTransition {
                entity: key.entity.clone(),
                phase: key.phase.clone(),
                from,
                to: target,
            });
        }

        if target.is_gated() {
            if let Err(err) = self.check(key).await {
                warn!(error = %err, "transition rejected");
                return Err(err);
            }
        }

        let patch = WorkflowPatch {
            status: Some(target),
            ..patch
        };
        let entry = self.store.upsert(key, &patch).await?;
        info!(%from, to = %entry.status, "workflow advanced");
        Ok(entry)
    }

    /// Every phase of `entity`'s catalog in order, with its stored entry.
    pub async fn overview(&self, entity: &EntityRef) -> EngineResult<Vec<PhaseProgress>> {
        let catalog = self.registry.catalog(entity.entity_type());
        let mut rows = Vec::with_capacity(catalog.len());
        for phase in catalog.iter() {
            let key = WorkflowKey::new(entity.clone(), phase.id.clone());
            let entry = self.store.get(&key).await?;
            rows.push(PhaseProgress {
                phase: phase.id.clone(),
                name: phase.name.clone(),
                status: entry.as_ref().map(|e| e.status).unwrap_or_default(),
                entry,
            });
        }
        Ok(rows)
    }
}

/// Returns what keeps `phase` of `entity` from being fully approved.
///
/// `None` when at least one document exists and all are approved.
pub async fn document_shortfall(
    ledger: &dyn DocumentLedger,
    entity: &EntityRef,
    phase: &PhaseId,
) -> EngineResult<Option<DocumentShortfall>> {
    let docs = ledger.list_documents(entity, phase).await?;
    let outstanding: Vec<OutstandingDocument> = docs
        .iter()
        .filter(|d| !d.is_approved())
        .map(|d| OutstandingDocument {
            id: d.id.clone(),
            name: d.name.clone(),
            status: d.status,
        })
        .collect();

    if docs.is_empty() || !outstanding.is_empty() {
        Ok(Some(DocumentShortfall {
            phase: phase.clone(),
            outstanding,
        }))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ids::{CommunityId, PlantId};
    use crate::ledger::{Document, DocumentStatus, InMemoryDocuments, InMemoryPlants};
    use crate::workflow::clock::ManualClock;
    use crate::workflow::store::InMemoryWorkflowStore;
    use chrono::{Duration, TimeZone, Utc};

    struct Fixture {
        clock: Arc<ManualClock>,
        store: Arc<InMemoryWorkflowStore>,
        docs: Arc<InMemoryDocuments>,
        gate: GateEvaluator,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap(),
        ));
        let store = Arc::new(InMemoryWorkflowStore::with_clock(clock.clone()));
        let docs = Arc::new(InMemoryDocuments::new());
        let plants = Arc::new(InMemoryPlants::default());
        let gate = GateEvaluator::new(
            Arc::new(PhaseRegistry::builtin()),
            store.clone(),
            docs.clone(),
            plants,
        );
        Fixture {
            clock,
            store,
            docs,
            gate,
        }
    }

    fn plant() -> EntityRef {
        EntityRef::Plant(PlantId::new("IMP-1"))
    }

    async fn approve(docs: &InMemoryDocuments, entity: EntityRef, phase: &str, id: &str) {
        docs.insert(entity, PhaseId::new(phase), Document::new(id, id, DocumentStatus::Approved))
            .await;
    }

    #[test]
    fn community_split_phase_has_both_prerequisites() {
        let f = fixture();
        let key = WorkflowKey::new(EntityRef::Community(CommunityId::new("C")), "3");
        let prereqs = f.gate.prerequisites(&key).unwrap();
        assert_eq!(prereqs.len(), 2);
        assert_eq!(
            prereqs[0],
            Prerequisite::Documents {
                phase: PhaseId::new("2")
            }
        );
        assert!(matches!(prereqs[1], Prerequisite::OwnedPlants(_)));
    }

    #[test]
    fn first_phase_is_ungated() {
        let f = fixture();
        let key = WorkflowKey::new(plant(), "P0");
        assert!(f.gate.prerequisites(&key).unwrap().is_empty());
    }

    #[tokio::test]
    async fn ungated_phase_advances_freely() {
        let f = fixture();
        let key = WorkflowKey::new(plant(), "P0");
        let entry = f
            .gate
            .advance(&key, Status::InReview, WorkflowPatch::default().with_owner("giulia"))
            .await
            .unwrap();
        assert_eq!(entry.status, Status::InReview);
        assert_eq!(entry.owner.as_deref(), Some("giulia"));
    }

    #[tokio::test]
    async fn skipping_review_is_illegal() {
        let f = fixture();
        let key = WorkflowKey::new(plant(), "P0");
        let err = f
            .gate
            .advance(&key, Status::Done, WorkflowPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert!(f.store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn done_to_todo_is_illegal() {
        let f = fixture();
        let key = WorkflowKey::new(plant(), "P0");
        f.gate.advance(&key, Status::InReview, WorkflowPatch::default()).await.unwrap();
        f.gate.advance(&key, Status::Done, WorkflowPatch::default()).await.unwrap();
        let before = f.store.snapshot().await;
        let err = f
            .gate
            .advance(&key, Status::Todo, WorkflowPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(f.store.snapshot().await, before);
    }

    #[tokio::test]
    async fn unknown_phase_rejected() {
        let f = fixture();
        let key = WorkflowKey::new(plant(), "3");
        let err = f
            .gate
            .advance(&key, Status::InReview, WorkflowPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownPhase);
    }

    #[tokio::test]
    async fn gate_requires_prerequisite_documents() {
        let f = fixture();
        let key = WorkflowKey::new(plant(), "P2");

        let err = f
            .gate
            .advance(&key, Status::InReview, WorkflowPatch::default())
            .await
            .unwrap_err();
        match err.details() {
            Some(GateDetails::MissingDocs(s)) => assert!(s.nothing_uploaded()),
            other => panic!("unexpected details: {other:?}"),
        }

        approve(&f.docs, plant(), "P1", "D-1").await;
        f.docs
            .insert(
                plant(),
                PhaseId::new("P1"),
                Document::new("D-2", "Grid quote", DocumentStatus::Rejected),
            )
            .await;
        let err = f
            .gate
            .advance(&key, Status::InReview, WorkflowPatch::default())
            .await
            .unwrap_err();
        match err.details() {
            Some(GateDetails::MissingDocs(s)) => {
                assert_eq!(s.outstanding.len(), 1);
                assert_eq!(s.outstanding[0].id.as_str(), "D-2");
                assert_eq!(s.outstanding[0].status, DocumentStatus::Rejected);
            }
            other => panic!("unexpected details: {other:?}"),
        }
        assert!(f.store.snapshot().await.is_empty());

        f.docs
            .set_status(&plant(), &PhaseId::new("P1"), "D-2", DocumentStatus::Approved)
            .await;
        let entry = f
            .gate
            .advance(&key, Status::InReview, WorkflowPatch::default())
            .await
            .unwrap();
        assert_eq!(entry.status, Status::InReview);
    }

    #[tokio::test]
    async fn repeated_review_is_noop_that_refreshes_timestamp() {
        let f = fixture();
        approve(&f.docs, plant(), "P0", "D-0").await;
        let key = WorkflowKey::new(plant(), "P1");
        let first = f
            .gate
            .advance(&key, Status::InReview, WorkflowPatch::default())
            .await
            .unwrap();
        f.clock.advance(Duration::hours(1));
        let second = f
            .gate
            .advance(&key, Status::InReview, WorkflowPatch::default().with_notes("still waiting"))
            .await
            .unwrap();
        assert_eq!(second.status, Status::InReview);
        assert_eq!(second.notes.as_deref(), Some("still waiting"));
        assert!(second.updated_at > first.updated_at);
    }

    #[tokio::test]
    async fn todo_self_transition_skips_gate() {
        let f = fixture();
        let key = WorkflowKey::new(plant(), "P3");
        let entry = f
            .gate
            .advance(&key, Status::Todo, WorkflowPatch::default().with_owner("marco"))
            .await
            .unwrap();
        assert_eq!(entry.status, Status::Todo);
        assert_eq!(entry.owner.as_deref(), Some("marco"));
    }

    #[tokio::test]
    async fn ledger_outage_is_store_unavailable() {
        let f = fixture();
        f.docs.set_available(false);
        let key = WorkflowKey::new(plant(), "P1");
        let err = f
            .gate
            .advance(&key, Status::InReview, WorkflowPatch::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(f.store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn overview_lists_catalog_in_order() {
        let f = fixture();
        let key = WorkflowKey::new(plant(), "P0");
        f.gate.advance(&key, Status::InReview, WorkflowPatch::default()).await.unwrap();
        let rows = f.gate.overview(&plant()).await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.phase.as_str()).collect();
        assert_eq!(ids, ["P0", "P1", "P2", "P3", "P4"]);
        assert_eq!(rows[0].status, Status::InReview);
        assert!(rows[1].entry.is_none());
        assert_eq!(rows[1].status, Status::Todo);
    }
}
