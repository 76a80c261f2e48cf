//! Calculation run: split every plant of a community for one period.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::EngineResult;
use crate::ids::{CommunityId, Period};
use crate::ledger::{AllocationStore, PlantDirectory};

use super::aggregate::aggregate;
use super::split::split_plant;
use super::types::{AggregatedResult, AllocationResult};

/// Outcome of a calculation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub community: CommunityId,
    pub period: Period,
    /// One result per plant, in plant-id order.
    pub plants: Vec<AllocationResult>,
    pub members: AggregatedResult,
    /// Whether results were written back onto the allocation records.
    pub confirmed: bool,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Run {} / {} ===", self.community, self.period)?;
        for result in &self.plants {
            writeln!(
                f,
                "{:<16} E={:>10.3}  cer={:>10.3}  contra={:>10.3}",
                result.plant_id, result.totals.e, result.totals.cer, result.totals.contra
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.members)?;
        write!(f, "Confirmed: {}", if self.confirmed { "yes" } else { "no" })
    }
}

/// Splits and aggregates every plant of a community.
#[derive(Clone)]
pub struct CalculationRun {
    plants: Arc<dyn PlantDirectory>,
    allocations: Arc<dyn AllocationStore>,
}

impl CalculationRun {
    pub fn new(plants: Arc<dyn PlantDirectory>, allocations: Arc<dyn AllocationStore>) -> Self {
        Self {
            plants,
            allocations,
        }
    }

    /// Runs the calculation for `community` over `period`.
    ///
    /// Plants without an allocation record for the period get the empty
    /// record created on first reference. When `confirm` is set, each
    /// plant's result is saved back onto its allocation record in a single
    /// [`AllocationStore::save_all`] call, and only after every plant has
    /// split successfully. A failed write confirms no plant.
    ///
    /// # Errors
    ///
    /// The first split error, or `StoreUnavailable` from the collaborators.
    #[instrument(skip_all, fields(community = %community, period = %period, confirm))]
    pub async fn execute(
        &self,
        community: &CommunityId,
        period: &Period,
        confirm: bool,
    ) -> EngineResult<RunReport> {
        let mut plants = self.plants.list_plants(community).await?;
        plants.sort_by(|a, b| a.id.cmp(&b.id));

        let mut split = Vec::with_capacity(plants.len());
        for plant in &plants {
            let allocation = self.allocations.get_or_create(&plant.id, period).await?;
            let result = split_plant(plant, &allocation)?;
            debug!(plant = %plant.id, distributed_kwh = result.distributed_kwh(), "plant split");
            split.push((allocation, result));
        }

        let results: Vec<AllocationResult> = split.iter().map(|(_, r)| r.clone()).collect();
        let members = aggregate(&results);

        if confirm {
            let confirmed = split
                .into_iter()
                .map(|(mut allocation, result)| {
                    allocation.confirmed = Some(result);
                    allocation
                })
                .collect();
            self.allocations.save_all(confirmed).await?;
        }

        info!(
            plants = results.len(),
            members = members.len(),
            total_kwh = members.total_kwh(),
            confirm,
            "calculation run complete"
        );

        Ok(RunReport {
            community: community.clone(),
            period: period.clone(),
            plants: results,
            members,
            confirmed: confirm,
        })
    }
}
