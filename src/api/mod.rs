//! REST API over the allocation engine and the workflow gates.
//!
//! Endpoints:
//! - `GET /phases`: both phase catalogs
//! - `POST /split`: split one plant's shared energy
//! - `POST /aggregate`: sum member totals across split results
//! - `POST /runs`: calculation run for a community and period
//! - `POST /workflow/advance`: gated workflow transition
//! - `GET /workflow/{entity_type}/{entity_id}`: phase overview
//!
//! Engine errors are returned as an `ErrorBody` JSON with a status derived
//! from the error kind (see [`types::status_for`]).

mod handlers;
pub mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

use crate::engine::Engine;

/// Application state shared across all request handlers.
pub struct AppState {
    pub engine: Engine,
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/phases", get(handlers::get_phases))
        .route("/split", post(handlers::post_split))
        .route("/aggregate", post(handlers::post_aggregate))
        .route("/runs", post(handlers::post_run))
        .route("/workflow/advance", post(handlers::post_advance))
        .route(
            "/workflow/{entity_type}/{entity_id}",
            get(handlers::get_workflow),
        )
        .with_state(state)
}

/// Binds to the given address and serves the API until the process exits.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
