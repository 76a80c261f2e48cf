//! Integration tests for the REST API feature.

#![cfg(feature = "api")]

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use cer_engine::api::{AppState, router};

async fn build_api_state() -> Arc<AppState> {
    let (_, _, engine) = common::demo().await;
    Arc::new(AppState { engine })
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(resp: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn split_then_aggregate() {
    let app = router(build_api_state().await);

    let split = json!({
        "plant": {"id": "IMP-1", "community_id": "CER-1", "typology": "A", "pct_shared": 45.0, "pct_other": 55.0},
        "allocation": {
            "plant_id": "IMP-1",
            "period": "2024-03",
            "energy_shared_kwh": 1280.0,
            "weights": {
                "consumers": [{"member": "m1", "basis_kwh": 320.0}, {"member": "m2", "basis_kwh": 480.0}],
                "producers": [{"member": "p1", "basis_kwh": 400.0}, {"member": "p2", "basis_kwh": 600.0}]
            }
        }
    });
    let resp = app.clone().oneshot(post("/split", &split)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let result = read_json(resp).await;
    assert_eq!(result["totals"]["E"], 1280.0);
    assert!((result["producers"][0]["kwh"].as_f64().unwrap() - 281.6).abs() < 1e-9);

    let resp = app
        .oneshot(post("/aggregate", &json!({ "results": [result.clone(), result] })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let totals = read_json(resp).await;
    assert!((totals["m1"].as_f64().unwrap() - 460.8).abs() < 1e-9);
}

#[tokio::test]
async fn insufficient_basis_returns_422() {
    let app = router(build_api_state().await);
    let split = json!({
        "plant": {"id": "IMP-1", "community_id": "CER-1", "typology": "B", "pct_shared": 50.0, "pct_other": 50.0},
        "allocation": {"plant_id": "IMP-1", "period": "2024-03", "energy_shared_kwh": 10.0,
                       "weights": {"consumers": [{"member": "m1", "basis_kwh": 1.0}]}}
    });
    let resp = app.oneshot(post("/split", &split)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json(resp).await["kind"], "insufficient_basis");
}

#[tokio::test]
async fn run_endpoint_reports_members() {
    let app = router(build_api_state().await);
    let resp = app
        .oneshot(post("/runs", &json!({"community_id": "CER-1", "period": "2024-03"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let report = read_json(resp).await;
    assert_eq!(report["confirmed"], false);
    assert_eq!(report["plants"].as_array().map(Vec::len), Some(2));
    assert!(report["members"]["s1"].is_number());
}

#[tokio::test]
async fn blocked_advance_returns_409_with_details() {
    let app = router(build_api_state().await);
    let body = json!({
        "entity_type": "community", "entity_id": "CER-1", "phase": "3", "target": "in-review"
    });
    let resp = app.clone().oneshot(post("/workflow/advance", &body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let err = read_json(resp).await;
    assert_eq!(err["kind"], "gate_not_met");
    assert_eq!(err["details"]["missingByPlant"][0]["plant_id"], "IMP-2");

    // store untouched: phase 3 still todo with no entry
    let req = Request::builder()
        .uri("/workflow/community/CER-1")
        .body(Body::empty())
        .unwrap();
    let rows = read_json(app.oneshot(req).await.unwrap()).await;
    assert_eq!(rows[3]["status"], "todo");
    assert!(rows[3]["entry"].is_null());
}

#[tokio::test]
async fn illegal_edge_returns_409() {
    let app = router(build_api_state().await);
    let body = json!({
        "entity_type": "plant", "entity_id": "IMP-1", "phase": "P0", "target": "done"
    });
    let resp = app.oneshot(post("/workflow/advance", &body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(read_json(resp).await["kind"], "invalid_transition");
}

#[tokio::test]
async fn successful_advance_returns_entry() {
    let app = router(build_api_state().await);
    let body = json!({
        "entity_type": "plant", "entity_id": "IMP-1", "phase": "P0", "target": "in-review",
        "owner": "field-team", "due_date": "2024-04-15"
    });
    let resp = app.oneshot(post("/workflow/advance", &body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let entry = read_json(resp).await;
    assert_eq!(entry["status"], "in-review");
    assert_eq!(entry["owner"], "field-team");
    assert_eq!(entry["due_date"], "2024-04-15");
}
