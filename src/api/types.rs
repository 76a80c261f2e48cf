//! API request, response and error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::allocation::types::{Allocation, AllocationResult, Plant};
use crate::error::{EngineError, ErrorBody, ErrorKind};
use crate::ids::{CommunityId, Period, PhaseId};
use crate::workflow::phase::{PhaseCatalog, PhaseDefinition};
use crate::workflow::types::{EntityRef, EntityType, Status, WorkflowKey, WorkflowPatch};

/// One phase of a catalog.
#[derive(Debug, Serialize)]
pub struct PhaseView {
    /// Phase identifier.
    pub id: PhaseId,
    /// Human-readable phase name.
    pub name: String,
    /// Zero-based position in the catalog.
    pub order: u32,
    /// Phase whose documents gate this one.
    pub prerequisite: Option<PhaseId>,
}

impl From<&PhaseDefinition> for PhaseView {
    fn from(p: &PhaseDefinition) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            order: p.order,
            prerequisite: p.prerequisite.clone(),
        }
    }
}

/// Both phase catalogs plus the cross-entity link.
#[derive(Debug, Serialize)]
pub struct PhasesResponse {
    /// Community catalog, in order.
    pub community: Vec<PhaseView>,
    /// Plant catalog, in order.
    pub plant: Vec<PhaseView>,
    /// `[community_phase, plant_phase]`, if configured.
    pub cross_entity: Option<(PhaseId, PhaseId)>,
}

pub(super) fn views(catalog: &PhaseCatalog) -> Vec<PhaseView> {
    catalog.iter().map(PhaseView::from).collect()
}

/// Body of `POST /split`.
#[derive(Debug, Deserialize)]
pub struct SplitRequest {
    /// Plant with percentages and typology tag.
    pub plant: Plant,
    /// Shared energy and weights for one period.
    pub allocation: Allocation,
}

/// Body of `POST /aggregate`.
#[derive(Debug, Deserialize)]
pub struct AggregateRequest {
    /// Split results to sum, in any order.
    pub results: Vec<AllocationResult>,
}

/// Body of `POST /runs`.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    /// Community whose plants are split.
    pub community_id: CommunityId,
    /// Billing period, e.g. `2024-03`.
    pub period: Period,
    /// Write results back onto the allocation records (default: false).
    #[serde(default)]
    pub confirm: bool,
}

/// Body of `POST /workflow/advance`.
#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    /// `community` or `plant`.
    pub entity_type: EntityType,
    /// Community or plant identifier.
    pub entity_id: String,
    /// Phase to move.
    pub phase: PhaseId,
    /// Requested status: `todo`, `in-review` or `done`.
    pub target: Status,
    /// Owner to record on the entry.
    #[serde(default)]
    pub owner: Option<String>,
    /// Due date (`YYYY-MM-DD`).
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl AdvanceRequest {
    pub fn key(&self) -> WorkflowKey {
        WorkflowKey::new(
            EntityRef::new(self.entity_type, self.entity_id.clone()),
            self.phase.clone(),
        )
    }

    pub fn patch(&self) -> WorkflowPatch {
        WorkflowPatch {
            status: None,
            owner: self.owner.clone(),
            due_date: self.due_date,
            notes: self.notes.clone(),
        }
    }
}

/// Engine error rendered as an HTTP response with an [`ErrorBody`].
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Configuration | ErrorKind::InsufficientBasis => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InvalidTransition | ErrorKind::GateNotMet => StatusCode::CONFLICT,
        ErrorKind::UnknownPhase => StatusCode::NOT_FOUND,
        ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody::from(&self.0);
        (status_for(body.kind), Json(body)).into_response()
    }
}
