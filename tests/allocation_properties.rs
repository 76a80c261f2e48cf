//! Property tests for plant splits and cross-plant aggregation.

mod common;

use proptest::prelude::*;

use cer_engine::allocation::aggregate::aggregate;
use cer_engine::allocation::split::split_plant;
use cer_engine::allocation::types::{AggregatedResult, AllocationResult, Plant};
use cer_engine::error::ErrorKind;
use cer_engine::ids::PlantId;

const MEMBERS: [&str; 6] = ["m1", "m2", "m3", "p1", "p2", "s1"];

/// Relative comparison, absolute below 1 kWh.
fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

fn plant(typology_b: bool, pct_shared: f64) -> Plant {
    let mut plant = if typology_b {
        common::plant_b("IMP-1")
    } else {
        common::plant_a("IMP-1")
    };
    plant.pct_shared = pct_shared;
    plant.pct_other = 100.0 - pct_shared;
    plant
}

fn same_totals(a: &AggregatedResult, b: &AggregatedResult) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(member, kwh)| b.get(member).is_some_and(|other| close(kwh, other)))
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Ordinary bases, zeros, and bases large enough to overflow a plain sum.
fn basis() -> impl Strategy<Value = f64> {
    prop_oneof![
        6 => 0.001f64..1e6,
        2 => 1e300f64..f64::MAX,
        1 => Just(0.0),
    ]
}

/// Weight list with at least one positive basis.
fn weights() -> impl Strategy<Value = Vec<(&'static str, f64)>> {
    prop::collection::vec((prop::sample::select(MEMBERS.to_vec()), basis()), 1..12)
        .prop_filter("group needs a positive basis", |w| w.iter().any(|(_, b)| *b > 0.0))
}

fn energy() -> impl Strategy<Value = f64> {
    prop_oneof![
        1 => Just(0.0),
        6 => 0.0f64..1e7,
        1 => 1e300f64..1e307,
    ]
}

/// Split results of up to five distinct plants.
fn split_batch() -> impl Strategy<Value = Vec<AllocationResult>> {
    let plant_case = (any::<bool>(), 0.0f64..=100.0, 0.0f64..1e5, weights(), weights());
    prop::collection::vec(plant_case, 1..6).prop_map(|cases| {
        cases
            .into_iter()
            .enumerate()
            .map(|(i, (typology_b, pct_shared, energy, consumers, benefit))| {
                let mut plant = plant(typology_b, pct_shared);
                plant.id = PlantId::new(format!("IMP-{i}"));
                let allocation = common::allocation(&plant, energy, &consumers, &benefit);
                split_plant(&plant, &allocation).expect("generated plants are valid")
            })
            .collect()
    })
}

// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

proptest! {
    /// Every kWh of shared energy lands on exactly one member.
    #[test]
    fn split_conserves_energy(
        typology_b in any::<bool>(),
        pct_shared in 0.0f64..=100.0,
        energy in energy(),
        consumers in weights(),
        benefit in weights(),
    ) {
        let plant = plant(typology_b, pct_shared);
        let allocation = common::allocation(&plant, energy, &consumers, &benefit);
        let result = split_plant(&plant, &allocation).unwrap();

        let cer: f64 = result.consumers.iter().map(|s| s.kwh).sum();
        let contra: f64 = result.producers.iter().chain(&result.prosumers).map(|s| s.kwh).sum();
        prop_assert!(close(cer, result.totals.cer), "consumers got {} of {}", cer, result.totals.cer);
        prop_assert!(close(contra, result.totals.contra), "benefit group got {} of {}", contra, result.totals.contra);
        prop_assert!(close(result.totals.cer + result.totals.contra, energy));
        for (role, share) in result.shares() {
            prop_assert!(share.kwh.is_finite() && share.kwh >= 0.0, "{} {} got {}", role, share.member, share.kwh);
        }
    }

    /// Bases whose sum overflows `f64` still receive the whole owed share.
    #[test]
    fn huge_bases_never_drop_owed_energy(
        bases in prop::collection::vec(1e300f64..=f64::MAX, 2..12),
        energy in 1.0f64..1e6,
    ) {
        let plant = plant(false, 45.0);
        let consumers: Vec<(&str, f64)> = bases
            .iter()
            .zip(MEMBERS.iter().cycle())
            .map(|(b, m)| (*m, *b))
            .collect();
        let allocation = common::allocation(&plant, energy, &consumers, &[("p1", 1.0)]);
        let result = split_plant(&plant, &allocation).unwrap();

        let cer: f64 = result.consumers.iter().map(|s| s.kwh).sum();
        prop_assert!(close(cer, result.totals.cer));
        prop_assert!(result.consumers.iter().all(|s| s.kwh > 0.0));
    }

    #[test]
    fn percentages_off_100_are_rejected(
        pct_shared in 0.0f64..200.0,
        pct_other in 0.0f64..200.0,
        energy in 0.0f64..1e6,
    ) {
        prop_assume!((pct_shared + pct_other - 100.0).abs() > 1e-6);
        let mut plant = common::plant_a("IMP-1");
        plant.pct_shared = pct_shared;
        plant.pct_other = pct_other;
        let allocation = common::allocation(&plant, energy, &[("m1", 1.0)], &[("p1", 1.0)]);

        let err = split_plant(&plant, &allocation).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    /// Non-finite or negative inputs fail instead of producing shares.
    #[test]
    fn invalid_numbers_are_rejected(
        bad in prop_oneof![
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
            -1e6f64..-1e-9,
        ],
        slot in 0usize..3,
    ) {
        let mut plant = common::plant_a("IMP-1");
        let (energy, basis) = match slot {
            0 => (bad, 1.0),
            1 => (100.0, bad),
            _ => {
                plant.pct_shared = bad;
                plant.pct_other = 100.0 - bad;
                (100.0, 1.0)
            }
        };
        let allocation = common::allocation(&plant, energy, &[("m1", basis)], &[("p1", 1.0)]);

        let err = split_plant(&plant, &allocation).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn aggregate_ignores_result_order(
        (batch, shuffled) in split_batch().prop_flat_map(|b| (Just(b.clone()), Just(b).prop_shuffle())),
    ) {
        prop_assert!(same_totals(&aggregate(&batch), &aggregate(&shuffled)));
    }

    /// Aggregating a batch equals summing the aggregates of any two halves.
    #[test]
    fn aggregate_is_associative(batch in split_batch(), cut in 0usize..6) {
        let cut = cut.min(batch.len());
        let whole = aggregate(&batch);
        let head = aggregate(&batch[..cut]);
        let tail = aggregate(&batch[cut..]);

        for (member, kwh) in whole.iter() {
            let parts = head.get(member).unwrap_or(0.0) + tail.get(member).unwrap_or(0.0);
            prop_assert!(close(parts, kwh), "{} differs: {} vs {}", member, parts, kwh);
        }
        prop_assert!(close(whole.total_kwh(), head.total_kwh() + tail.total_kwh()));
    }
}
