//! Flow groups: weighted collections of buildings and the net material
//! flow they imply.
//!
//! Every operator is pure and returns a new [`FlowGroup`]. Operands can be a
//! building, a bare material (one unit per second) or another group; see
//! [`Operand`].

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::models::{MaterialId, NodeId, ProductionNode, RateMap};

/// Net rates closer to zero than this are treated as exactly zero
pub const EPSILON: f64 = 1e-4;

/// Right-hand side of a flow group operator
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Node(&'a ProductionNode),
    Material(MaterialId),
    Group(&'a FlowGroup),
}

impl<'a> Operand<'a> {
    fn into_group(self) -> Cow<'a, FlowGroup> {
        match self {
            Operand::Node(node) => Cow::Owned(FlowGroup::from_node(node)),
            Operand::Material(material) => Cow::Owned(FlowGroup::from_material(material, 1.0)),
            Operand::Group(group) => Cow::Borrowed(group),
        }
    }
}

impl<'a> From<&'a ProductionNode> for Operand<'a> {
    fn from(node: &'a ProductionNode) -> Self {
        Operand::Node(node)
    }
}

impl<'a> From<&'a FlowGroup> for Operand<'a> {
    fn from(group: &'a FlowGroup) -> Self {
        Operand::Group(group)
    }
}

impl From<MaterialId> for Operand<'_> {
    fn from(material: MaterialId) -> Self {
        Operand::Material(material)
    }
}

/// A set of buildings with (possibly fractional) counts, plus the net rate
/// of every material they move. Positive rates are surplus, negative rates
/// are unmet demand.
///
/// Fractional counts mean partial-capacity operation. They are useful for
/// working out ratios but not always a buildable plan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowGroup {
    nodes: BTreeMap<NodeId, (ProductionNode, f64)>,
    rates: RateMap,
}

impl FlowGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// A group holding exactly one of `node`
    pub fn from_node(node: &ProductionNode) -> Self {
        Self::from_parts([(node.clone(), 1.0)], [])
    }

    /// A group with a raw material rate and no building behind it, used to
    /// express a demand (negative) or a free supply (positive).
    pub fn from_material(material: MaterialId, rate: f64) -> Self {
        Self::from_parts([], [(material, rate)])
    }

    /// Build a group from building counts and raw material rates. Repeated
    /// entries are summed.
    pub fn from_parts(
        nodes: impl IntoIterator<Item = (ProductionNode, f64)>,
        materials: impl IntoIterator<Item = (MaterialId, f64)>,
    ) -> Self {
        let mut group = Self::default();
        for (node, count) in nodes {
            for (material, rate) in node.net_rates() {
                *group.rates.entry(material).or_default() += count * rate;
            }
            group.nodes.entry(node.id()).or_insert((node, 0.0)).1 += count;
        }
        for (material, rate) in materials {
            *group.rates.entry(material).or_default() += rate;
        }
        group.prune();
        group
    }

    fn prune(&mut self) {
        self.rates.retain(|_, rate| rate.abs() >= EPSILON);
    }

    /// Sum of both groups. Counts and rates add; rates that cancel out are
    /// dropped, buildings are kept even at a residual count.
    pub fn add<'a>(&self, other: impl Into<Operand<'a>>) -> FlowGroup {
        let other: Operand<'a> = other.into();
        let other = other.into_group();
        let mut result = self.clone();
        for (id, (node, count)) in &other.nodes {
            result.nodes.entry(*id).or_insert((node.clone(), 0.0)).1 += count;
        }
        for (material, rate) in &other.rates {
            *result.rates.entry(*material).or_default() += rate;
        }
        result.prune();
        result
    }

    pub fn subtract<'a>(&self, other: impl Into<Operand<'a>>) -> FlowGroup {
        let other: Operand<'a> = other.into();
        self.add(&other.into_group().scale(-1.0))
    }

    /// Multiply every count and rate by `factor`. Negative factors are
    /// allowed and mean "remove this much capacity".
    pub fn scale(&self, factor: f64) -> FlowGroup {
        let mut result = FlowGroup {
            nodes: self
                .nodes
                .iter()
                .map(|(id, (node, count))| (*id, (node.clone(), count * factor)))
                .collect(),
            rates: self
                .rates
                .iter()
                .map(|(material, rate)| (*material, rate * factor))
                .collect(),
        };
        result.prune();
        result
    }

    /// Scalar division, `scale(1 / divisor)`
    pub fn divide(&self, divisor: f64) -> FlowGroup {
        self.scale(1.0 / divisor)
    }

    /// How many of `other` it takes to cover this group's demand.
    ///
    /// Looks at every material this group is short of and `other` has a
    /// surplus of, and returns the largest deficit/surplus ratio so that
    /// all of them end up covered. Fails with
    /// [`Error::UnsatisfiableDemand`] when there is no such material.
    pub fn ratio<'a>(&self, other: impl Into<Operand<'a>>) -> Result<f64> {
        let other: Operand<'a> = other.into();
        let other = other.into_group();
        let deficits = self.net_inputs();
        let surpluses = other.net_outputs();

        deficits
            .iter()
            .filter_map(|(material, demand)| {
                surpluses.get(material).map(|supply| -demand / supply)
            })
            .fold(None, |best: Option<f64>, ratio| {
                Some(best.map_or(ratio, |best| best.max(ratio)))
            })
            .ok_or(Error::UnsatisfiableDemand)
    }

    /// [`ratio`](Self::ratio) rounded up to whole buildings.
    ///
    /// A ratio within [`EPSILON`] of a whole number counts as that number,
    /// so rounding noise never adds a building.
    pub fn ceiling_ratio<'a>(&self, other: impl Into<Operand<'a>>) -> Result<f64> {
        let ratio = self.ratio(other)?;
        let nearest = ratio.round();
        if nearest >= 1.0 && (ratio - nearest).abs() < EPSILON {
            Ok(nearest)
        } else {
            Ok(ratio.ceil())
        }
    }

    /// Cover this group's demand with just enough of `other`.
    ///
    /// When the two share no deficit/surplus material, `other` is ignored
    /// and the result is a copy of this group.
    pub fn combine<'a>(&self, other: impl Into<Operand<'a>>) -> FlowGroup {
        let other: Operand<'a> = other.into();
        let other = other.into_group();
        match self.ratio(&*other) {
            Ok(ratio) => self.add(&other.scale(ratio)),
            Err(_) => self.clone(),
        }
    }

    /// Materials in deficit, with their (negative) rates
    pub fn net_inputs(&self) -> RateMap {
        self.rates
            .iter()
            .filter(|(_, rate)| **rate < 0.0)
            .map(|(material, rate)| (*material, *rate))
            .collect()
    }

    /// Materials in surplus, with their rates
    pub fn net_outputs(&self) -> RateMap {
        self.rates
            .iter()
            .filter(|(_, rate)| **rate > 0.0)
            .map(|(material, rate)| (*material, *rate))
            .collect()
    }

    pub fn rates(&self) -> &RateMap {
        &self.rates
    }

    /// Net rate of `material`, zero when absent
    pub fn rate(&self, material: MaterialId) -> f64 {
        self.rates.get(&material).copied().unwrap_or(0.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&ProductionNode, f64)> {
        self.nodes.values().map(|(node, count)| (node, *count))
    }

    /// Count of building `id`, zero when absent
    pub fn count(&self, id: NodeId) -> f64 {
        self.nodes.get(&id).map_or(0.0, |(_, count)| *count)
    }

    /// Tiles covered by all buildings in the group
    pub fn footprint(&self) -> f64 {
        self.nodes()
            .map(|(node, count)| count * f64::from(node.size()).powi(2))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.rates.is_empty()
    }
}

// Building arithmetic always goes through a singleton group.
impl ProductionNode {
    pub fn add<'a>(&self, other: impl Into<Operand<'a>>) -> FlowGroup {
        FlowGroup::from_node(self).add(other)
    }

    pub fn subtract<'a>(&self, other: impl Into<Operand<'a>>) -> FlowGroup {
        FlowGroup::from_node(self).subtract(other)
    }

    pub fn scale(&self, factor: f64) -> FlowGroup {
        FlowGroup::from_node(self).scale(factor)
    }

    pub fn divide(&self, divisor: f64) -> FlowGroup {
        FlowGroup::from_node(self).divide(divisor)
    }

    pub fn combine<'a>(&self, other: impl Into<Operand<'a>>) -> FlowGroup {
        FlowGroup::from_node(self).combine(other)
    }

    pub fn ratio<'a>(&self, other: impl Into<Operand<'a>>) -> Result<f64> {
        FlowGroup::from_node(self).ratio(other)
    }

    pub fn ceiling_ratio<'a>(&self, other: impl Into<Operand<'a>>) -> Result<f64> {
        FlowGroup::from_node(self).ceiling_ratio(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeDef, POWER};

    const X: MaterialId = MaterialId(100);
    const Y: MaterialId = MaterialId(101);
    const Z: MaterialId = MaterialId(102);

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn p() -> ProductionNode {
        NodeDef::new(1, "P", 0.0, 1).output(X, 2.0).build().unwrap()
    }

    fn q() -> ProductionNode {
        NodeDef::new(2, "Q", 0.0, 2)
            .input(X, 4.0)
            .output(Y, 1.0)
            .build()
            .unwrap()
    }

    #[test]
    fn group_net_rates_follow_node_counts() {
        let group = FlowGroup::from_parts([(q(), 3.0)], [(Z, 1.5)]);
        assert_eq!(group.rate(X), -12.0);
        assert_eq!(group.rate(Y), 3.0);
        assert_eq!(group.rate(Z), 1.5);
        // Q draws no power, so the entry is pruned
        assert!(!group.rates().contains_key(&POWER));
        assert_eq!(group.count(NodeId(2)), 3.0);
        assert_eq!(group.footprint(), 12.0);
    }

    #[test]
    fn ratio_and_combine_cover_demand() {
        let group = FlowGroup::from_node(&q()).scale(1.0);
        assert_eq!(group.ratio(&p()).unwrap(), 2.0);

        let combined = group.combine(&p());
        assert_eq!(combined.rate(Y), 1.0);
        assert!(!combined.rates().contains_key(&X));
        assert_eq!(combined.count(NodeId(2)), 1.0);
        assert_eq!(combined.count(NodeId(1)), 2.0);
    }

    #[test]
    fn ratio_picks_largest_candidate() {
        let supplier = NodeDef::new(3, "S", 0.0, 1)
            .output(X, 1.0)
            .output(Y, 2.0)
            .build()
            .unwrap();
        let demand = FlowGroup::from_parts([], [(X, -3.0), (Y, -10.0)]);

        let ratio = demand.ratio(&supplier).unwrap();
        assert_eq!(ratio, 5.0);

        let covered = demand.add(&supplier.scale(ratio));
        assert!(covered.net_inputs().is_empty());
        assert_eq!(covered.rate(X), 2.0);
    }

    #[test]
    fn ratio_without_shared_material_fails() {
        let demand = FlowGroup::from_material(Z, -1.0);
        assert_eq!(demand.ratio(&p()), Err(Error::UnsatisfiableDemand));
        // Surplus on both sides is not a relationship either
        let supply = FlowGroup::from_material(X, 1.0);
        assert_eq!(supply.ratio(&p()), Err(Error::UnsatisfiableDemand));
    }

    #[test]
    fn combine_without_shared_material_returns_left_operand() {
        let demand = FlowGroup::from_material(Z, -1.0);
        assert_eq!(demand.combine(&p()), demand);
    }

    #[test]
    fn ceiling_ratio_rounds_up() {
        let demand = FlowGroup::from_material(X, -5.0);
        assert_eq!(demand.ratio(&p()).unwrap(), 2.5);
        assert_eq!(demand.ceiling_ratio(&p()).unwrap(), 3.0);

        let exact = FlowGroup::from_material(X, -4.0);
        assert_eq!(exact.ceiling_ratio(&p()).unwrap(), 2.0);
    }

    #[test]
    fn ceiling_ratio_ignores_rounding_noise() {
        let press = crate::builtin::catalog()
            .unwrap()
            .node(NodeId(701))
            .unwrap()
            .clone();
        for k in 1..200 {
            let demand = FlowGroup::from_material(crate::builtin::GRAPHITE, -0.66 * f64::from(k));
            assert_eq!(demand.ceiling_ratio(&press).unwrap(), f64::from(k), "{k} presses");
        }

        // A tiny demand still needs one building
        let trickle = FlowGroup::from_material(X, -0.001);
        assert_eq!(trickle.ceiling_ratio(&p()).unwrap(), 1.0);
    }

    #[test]
    fn add_prunes_cancelled_rates_but_keeps_nodes() {
        let group = FlowGroup::from_node(&p()).add(&FlowGroup::from_material(X, -2.0));
        assert!(group.rates().is_empty());
        assert_eq!(group.count(NodeId(1)), 1.0);

        let near_zero = FlowGroup::from_material(X, 1.0).add(&FlowGroup::from_material(X, -0.99995));
        assert!(near_zero.rates().is_empty());
    }

    #[test]
    fn subtract_undoes_add() {
        let a = FlowGroup::from_parts([(q(), 2.0)], [(Z, 0.5)]);
        let b = FlowGroup::from_node(&p());
        let back = a.add(&b).subtract(&b);
        for (material, rate) in a.rates() {
            assert!(approx(back.rate(*material), *rate));
        }
        assert!(approx(back.count(NodeId(1)), 0.0));
    }

    #[test]
    fn scale_and_divide_are_inverse() {
        let a = FlowGroup::from_parts([(q(), 1.5)], [(Z, 2.0)]);
        assert_eq!(a.scale(1.0), a);
        let back = a.scale(4.0).divide(4.0);
        assert!(approx(back.rate(X), a.rate(X)));
        assert!(approx(back.count(NodeId(2)), 1.5));
    }

    #[test]
    fn operands_wrap_as_singleton_groups() {
        let group = FlowGroup::new().add(X).add(&p());
        assert_eq!(group.rate(X), 3.0);
        assert_eq!(group.count(NodeId(1)), 1.0);

        let from_node = q().add(&p());
        assert_eq!(from_node.rate(X), -2.0);
        assert_eq!(q().combine(&p()).count(NodeId(1)), 2.0);
        assert_eq!(q().ratio(&p()).unwrap(), 2.0);
        assert_eq!(q().subtract(&q()).rates().len(), 0);
    }

    #[test]
    fn net_inputs_and_outputs_split_by_sign() {
        let group = FlowGroup::from_node(&q());
        assert_eq!(group.net_inputs(), RateMap::from([(X, -4.0)]));
        assert_eq!(group.net_outputs(), RateMap::from([(Y, 1.0)]));
    }
}
