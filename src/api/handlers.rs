//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};

use crate::allocation::aggregate::aggregate;
use crate::allocation::run::RunReport;
use crate::allocation::split::split_plant;
use crate::allocation::types::{AggregatedResult, AllocationResult};
use crate::workflow::gate::PhaseProgress;
use crate::workflow::types::{EntityRef, EntityType, WorkflowEntry};

use super::AppState;
use super::types::{
    AdvanceRequest, AggregateRequest, ApiError, PhasesResponse, RunRequest, SplitRequest, views,
};

/// Returns both phase catalogs.
///
/// `GET /phases` → 200 + `PhasesResponse` JSON
pub async fn get_phases(State(state): State<Arc<AppState>>) -> Json<PhasesResponse> {
    let registry = state.engine.registry();
    Json(PhasesResponse {
        community: views(registry.catalog(EntityType::Community)),
        plant: views(registry.catalog(EntityType::Plant)),
        cross_entity: registry
            .cross_entity()
            .map(|r| (r.community_phase.clone(), r.plant_phase.clone())),
    })
}

/// Splits one plant's shared energy.
///
/// `POST /split` → 200 + `AllocationResult`, 422 on bad input
pub async fn post_split(Json(req): Json<SplitRequest>) -> Result<Json<AllocationResult>, ApiError> {
    Ok(Json(split_plant(&req.plant, &req.allocation)?))
}

/// Sums member totals across results.
///
/// `POST /aggregate` → 200 + member → kWh map
pub async fn post_aggregate(Json(req): Json<AggregateRequest>) -> Json<AggregatedResult> {
    Json(aggregate(&req.results))
}

/// Runs the calculation for a community and period.
///
/// `POST /runs` → 200 + `RunReport`
pub async fn post_run(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunRequest>,
) -> Result<Json<RunReport>, ApiError> {
    let report = state
        .engine
        .run(&req.community_id, &req.period, req.confirm)
        .await?;
    Ok(Json(report))
}

/// Requests a workflow transition.
///
/// `POST /workflow/advance` → 200 + updated entry, 404/409/503 on failure
pub async fn post_advance(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdvanceRequest>,
) -> Result<Json<WorkflowEntry>, ApiError> {
    let entry = state
        .engine
        .advance(&req.key(), req.target, req.patch())
        .await?;
    Ok(Json(entry))
}

/// Lists an entity's phases in order with their entries.
///
/// `GET /workflow/{entity_type}/{entity_id}` → 200 + `Vec<PhaseProgress>`
pub async fn get_workflow(
    State(state): State<Arc<AppState>>,
    Path((entity_type, entity_id)): Path<(EntityType, String)>,
) -> Result<Json<Vec<PhaseProgress>>, ApiError> {
    let entity = EntityRef::new(entity_type, entity_id);
    Ok(Json(state.engine.overview(&entity).await?))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::dataset::Dataset;
    use crate::engine::InMemoryBackend;
    use crate::workflow::phase::PhaseRegistry;

    async fn make_test_state() -> (InMemoryBackend, Arc<AppState>) {
        let backend = InMemoryBackend::new();
        let dataset = Dataset::from_preset("demo").unwrap_or_default();
        backend.seed(&dataset).await.unwrap();
        let engine = backend.engine(Arc::new(PhaseRegistry::builtin()));
        (backend, Arc::new(AppState { engine }))
    }

    fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json(resp: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn phases_returns_200() {
        let (_, state) = make_test_state().await;
        let req = Request::builder().uri("/phases").body(Body::empty()).unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json(resp).await;
        assert_eq!(json["community"].as_array().map(Vec::len), Some(7));
        assert_eq!(json["plant"][3]["prerequisite"], "P2");
    }

    #[tokio::test]
    async fn split_bad_percentages_returns_422() {
        let (_, state) = make_test_state().await;
        let body = serde_json::json!({
            "plant": {"id": "X", "community_id": "C", "typology": "A", "pct_shared": 50.0, "pct_other": 40.0},
            "allocation": {"plant_id": "X", "period": "2024-01", "energy_shared_kwh": 10.0}
        });
        let resp = router(state).oneshot(post("/split", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json(resp).await["kind"], "configuration");
    }

    #[tokio::test]
    async fn advance_unknown_phase_returns_404() {
        let (_, state) = make_test_state().await;
        let body = serde_json::json!({
            "entity_type": "community", "entity_id": "CER-1", "phase": "P3", "target": "in-review"
        });
        let resp = router(state).oneshot(post("/workflow/advance", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn store_outage_returns_503() {
        let (backend, state) = make_test_state().await;
        backend.workflow.set_available(false);
        let req = Request::builder()
            .uri("/workflow/plant/IMP-1")
            .body(Body::empty())
            .unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json(resp).await["kind"], "store_unavailable");
    }
}
