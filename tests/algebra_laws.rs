//! Property-based tests for the flow group algebra.
//!
//! Uses proptest to generate random groups over a small synthetic catalog,
//! then checks the algebraic laws the operators promise.

use mindustry_calculator::{EPSILON, Error, FlowGroup, MaterialId, NodeDef, ProductionNode};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

const MATERIALS: u32 = 8;

fn nodes() -> Vec<ProductionNode> {
    let m = MaterialId;
    [
        NodeDef::new(1, "Press", -30.0, 2).input(m(1), 2.0).output(m(2), 1.0),
        NodeDef::new(2, "Mixer", -12.0, 2)
            .input(m(2), 0.5)
            .input(m(3), 1.5)
            .output(m(4), 0.75),
        NodeDef::new(3, "Generator", 60.0, 1).input(m(5), 0.5),
        NodeDef::new(4, "Splitter", 0.0, 3)
            .input(m(6), 4.0)
            .output(m(7), 1.2)
            .output(m(8), 0.4),
    ]
    .into_iter()
    .map(|def| def.build().unwrap())
    .collect()
}

fn arb_rate() -> impl Strategy<Value = f64> {
    prop_oneof![-100.0..-0.01f64, 0.01..100.0f64]
}

/// Random group: some building counts plus some raw material rates
fn arb_group() -> impl Strategy<Value = FlowGroup> {
    (
        proptest::collection::vec((0..4usize, 0.1..10.0f64), 0..4),
        proptest::collection::vec((1..=MATERIALS, arb_rate()), 0..6),
    )
        .prop_map(|(counts, rates)| {
            let catalog = nodes();
            FlowGroup::from_parts(
                counts
                    .into_iter()
                    .map(|(i, count)| (catalog[i].clone(), count)),
                rates
                    .into_iter()
                    .map(|(id, rate)| (MaterialId(id), rate)),
            )
        })
}

// ===========================================================================
// Helpers
// ===========================================================================

/// Same buildings and same net rates, up to `tolerance`
fn assert_close(a: &FlowGroup, b: &FlowGroup, tolerance: f64) -> Result<(), TestCaseError> {
    for id in 0..=MATERIALS {
        let m = MaterialId(id);
        prop_assert!(
            (a.rate(m) - b.rate(m)).abs() <= tolerance,
            "{} differs: {} vs {}",
            m,
            a.rate(m),
            b.rate(m)
        );
    }
    for node in nodes() {
        prop_assert!((a.count(node.id()) - b.count(node.id())).abs() <= 1e-9);
    }
    Ok(())
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn add_is_commutative(a in arb_group(), b in arb_group()) {
        assert_close(&a.add(&b), &b.add(&a), EPSILON)?;
    }

    #[test]
    fn subtract_undoes_add(a in arb_group(), b in arb_group()) {
        assert_close(&a.add(&b).subtract(&b), &a, EPSILON + 1e-9)?;
    }

    #[test]
    fn scale_by_one_is_identity(a in arb_group()) {
        prop_assert_eq!(a.scale(1.0), a);
    }

    #[test]
    fn scale_then_unscale_is_identity(a in arb_group(), k in 0.1..10.0f64) {
        // Rates pruned after the first scaling cannot come back
        prop_assume!(a.rates().values().all(|r| r.abs() * k.min(1.0 / k) >= EPSILON));
        assert_close(&a.scale(k).scale(1.0 / k), &a, EPSILON)?;
        assert_close(&a.divide(k).scale(k), &a, EPSILON)?;
    }

    #[test]
    fn ratio_covers_every_shared_deficit(
        deficit_x in 0.1..100.0f64,
        deficit_y in 0.1..100.0f64,
        surplus_x in 0.1..10.0f64,
        surplus_y in 0.1..10.0f64,
    ) {
        let (x, y) = (MaterialId(1), MaterialId(2));
        let demand = FlowGroup::from_material(x, -deficit_x)
            .add(&FlowGroup::from_material(y, -deficit_y));
        let supply = FlowGroup::from_material(x, surplus_x)
            .add(&FlowGroup::from_material(y, surplus_y));

        let ratio = demand.ratio(&supply).unwrap();
        let expected = (deficit_x / surplus_x).max(deficit_y / surplus_y);
        prop_assert!((ratio - expected).abs() <= 1e-9 * expected.max(1.0));

        let covered = demand.add(&supply.scale(ratio));
        prop_assert!(covered.rate(x) >= -EPSILON);
        prop_assert!(covered.rate(y) >= -EPSILON);
        prop_assert!(covered.net_inputs().is_empty());
    }

    #[test]
    fn ceiling_ratio_is_smallest_integer_above_ratio(a in arb_group(), b in arb_group()) {
        match (a.ratio(&b), a.ceiling_ratio(&b)) {
            (Ok(ratio), Ok(ceiling)) => {
                prop_assert_eq!(ceiling.fract(), 0.0);
                prop_assert!(ceiling >= 1.0);
                prop_assert!(ceiling > ratio - EPSILON);
                prop_assert!(ceiling - 1.0 < ratio);
            }
            (Err(Error::UnsatisfiableDemand), Err(Error::UnsatisfiableDemand)) => {}
            (ratio, ceiling) => {
                prop_assert!(false, "ratio {:?} but ceiling {:?}", ratio, ceiling);
            }
        }
    }

    #[test]
    fn combine_without_overlap_keeps_the_group(a in arb_group(), b in arb_group()) {
        if a.ratio(&b).is_err() {
            prop_assert_eq!(a.combine(&b), a);
        }
    }
}
