//! Back-office core for Renewable Energy Communities: per-plant energy
//! allocation and the phased workflow with document gates.

/// Energy split per plant, aggregation, and calculation runs.
pub mod allocation;
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod ids;
pub mod io;
/// Document ledger, plant enumeration and allocation persistence.
pub mod ledger;
pub mod logging;
/// Phase catalogs, workflow store, and the gate evaluator.
pub mod workflow;
