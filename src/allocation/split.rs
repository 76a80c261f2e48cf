//! Proportional split of one plant's shared energy among its members.

use crate::error::{EngineError, EngineResult};
use crate::ids::PlantId;

use super::types::{Allocation, AllocationResult, MemberShare, Plant, Role, Totals, Typology, WeightEntry};

/// Tolerance on `pct_shared + pct_other == 100`.
const PCT_SUM_TOLERANCE: f64 = 1e-9;

/// Splits a plant's shared energy across consumers and the typology's
/// benefit group (producers for `A`, prosumers for `B`).
///
/// `Qshared = E * pct_shared / 100` goes to consumers and
/// `Qother = E * pct_other / 100` to the benefit group, each in exact
/// proportion to member basis over the group's total basis. No rounding is
/// applied. The group not selected by the typology is returned empty.
///
/// # Arguments
///
/// * `plant` - Plant with percentages and typology tag
/// * `allocation` - Shared energy and weight lists for one period
///
/// # Errors
///
/// * `Configuration` if percentages do not sum to 100, any value is negative
///   or non-finite, or the allocation belongs to another plant
/// * `InvalidTypology` if the typology tag is not `A` or `B`
/// * `InsufficientBasis` if a group is owed a positive share but its basis
///   sums to 0
///
/// # Examples
///
/// ```
/// use cer_engine::allocation::split::split_plant;
/// use cer_engine::allocation::types::{Allocation, Plant, WeightEntry};
/// use cer_engine::ids::{CommunityId, Period, PlantId};
///
/// let plant = Plant {
///     id: PlantId::new("IMP-1"),
///     community_id: CommunityId::new("CER-1"),
///     typology: "A".into(),
///     pct_shared: 45.0,
///     pct_other: 55.0,
/// };
/// let mut allocation = Allocation::empty(plant.id.clone(), Period::new("2024-03"));
/// allocation.energy_shared_kwh = 1280.0;
/// allocation.weights.consumers = vec![WeightEntry::new("m1", 320.0), WeightEntry::new("m2", 480.0)];
/// allocation.weights.producers = vec![WeightEntry::new("p1", 1.0)];
///
/// let result = split_plant(&plant, &allocation).unwrap();
/// assert!((result.consumers[0].kwh - 230.4).abs() < 1e-9);
/// assert!((result.producers[0].kwh - 704.0).abs() < 1e-9);
/// ```
pub fn split_plant(plant: &Plant, allocation: &Allocation) -> EngineResult<AllocationResult> {
    if allocation.plant_id != plant.id {
        return Err(EngineError::Configuration(format!(
            "allocation for plant {} passed with plant {}",
            allocation.plant_id, plant.id
        )));
    }
    validate_percentages(plant)?;
    let typology =
        Typology::parse(&plant.typology).ok_or_else(|| EngineError::InvalidTypology {
            plant: plant.id.clone(),
            typology: plant.typology.clone(),
        })?;

    let energy = allocation.energy_shared_kwh;
    if !energy.is_finite() || energy < 0.0 {
        return Err(EngineError::Configuration(format!(
            "plant {}: energy_shared_kwh must be a non-negative number, got {energy}",
            plant.id
        )));
    }

    let q_shared = energy * (plant.pct_shared / 100.0);
    let q_other = energy * (plant.pct_other / 100.0);

    let weights = &allocation.weights;
    let consumers = distribute(&plant.id, Role::Consumer, q_shared, weights.group(Role::Consumer))?;
    let benefit_role = typology.benefit_role();
    let benefit = distribute(&plant.id, benefit_role, q_other, weights.group(benefit_role))?;

    let (producers, prosumers) = match benefit_role {
        Role::Producer => (benefit, Vec::new()),
        _ => (Vec::new(), benefit),
    };

    Ok(AllocationResult {
        plant_id: plant.id.clone(),
        consumers,
        producers,
        prosumers,
        totals: Totals {
            e: energy,
            cer: q_shared,
            contra: q_other,
        },
    })
}

fn validate_percentages(plant: &Plant) -> EngineResult<()> {
    let (shared, other) = (plant.pct_shared, plant.pct_other);
    if !shared.is_finite() || !other.is_finite() || shared < 0.0 || other < 0.0 {
        return Err(EngineError::Configuration(format!(
            "plant {}: percentages must be non-negative numbers (pct_shared={shared}, pct_other={other})",
            plant.id
        )));
    }
    if (shared + other - 100.0).abs() > PCT_SUM_TOLERANCE {
        return Err(EngineError::Configuration(format!(
            "plant {}: percentages do not sum to 100 (pct_shared={shared}, pct_other={other})",
            plant.id
        )));
    }
    Ok(())
}

/// Distributes `owed_kwh` across `group` proportionally to basis.
///
/// A group owed nothing yields 0 kWh per member even when its basis sums
/// to 0.
fn distribute(
    plant: &PlantId,
    role: Role,
    owed_kwh: f64,
    group: &[WeightEntry],
) -> EngineResult<Vec<MemberShare>> {
    if let Some(bad) = group
        .iter()
        .find(|w| !w.basis_kwh.is_finite() || w.basis_kwh < 0.0)
    {
        return Err(EngineError::Configuration(format!(
            "plant {plant}: {role} {} has invalid basis {}",
            bad.member, bad.basis_kwh
        )));
    }

    // Bases are scaled by the group maximum so the sum stays finite.
    let max_basis = group.iter().map(|w| w.basis_kwh).fold(0.0, f64::max);
    let scaled = |w: &WeightEntry| {
        if max_basis > 0.0 {
            w.basis_kwh / max_basis
        } else {
            0.0
        }
    };
    let total_scaled: f64 = group.iter().map(scaled).sum();
    if owed_kwh > 0.0 && total_scaled <= 0.0 {
        return Err(EngineError::InsufficientBasis {
            plant: plant.clone(),
            role,
            owed_kwh,
        });
    }

    let shares = group
        .iter()
        .map(|w| MemberShare {
            member: w.member.clone(),
            kwh: if total_scaled > 0.0 {
                owed_kwh * (scaled(w) / total_scaled)
            } else {
                0.0
            },
        })
        .collect();
    Ok(shares)
}
