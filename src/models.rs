//! Data models for Mindustry materials and production buildings

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Identifier of a material. Two materials are the same iff their ids match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialId(pub u32);

/// Identifier of a building, matching the in-game shortcut numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "material#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// The power grid, tracked as a material so generators can supply it
pub const POWER: MaterialId = MaterialId(0);

/// Material rates in units per second, keyed by material
pub type RateMap = BTreeMap<MaterialId, f64>;

#[derive(Debug, Clone)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    pub hardness: Option<u8>, // None = not a minable ore
    pub is_liquid: bool,
    pub is_natural: bool, // Found in the environment rather than manufactured
}

impl Material {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: MaterialId(id),
            name: name.into(),
            hardness: None,
            is_liquid: false,
            is_natural: false,
        }
    }

    /// A natural ore minable by drills of at least `hardness`
    pub fn ore(mut self, hardness: u8) -> Self {
        self.hardness = Some(hardness);
        self.is_natural = true;
        self
    }

    pub fn liquid(mut self) -> Self {
        self.is_liquid = true;
        self
    }

    pub fn natural(mut self) -> Self {
        self.is_natural = true;
        self
    }
}

impl PartialEq for Material {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Material {}

impl Hash for Material {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Static definition of a building as it appears in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDef {
    pub id: NodeId,
    pub name: String,
    pub power: f64, // Negative = consumes, Positive = generates
    pub size: u8,
    pub inputs: RateMap,
    pub outputs: RateMap,
    pub modal_efficiency: bool,
}

impl NodeDef {
    pub fn new(id: u32, name: impl Into<String>, power: f64, size: u8) -> Self {
        Self {
            id: NodeId(id),
            name: name.into(),
            power,
            size,
            inputs: RateMap::new(),
            outputs: RateMap::new(),
            modal_efficiency: false,
        }
    }

    pub fn input(mut self, material: MaterialId, rate: f64) -> Self {
        self.inputs.insert(material, rate);
        self
    }

    pub fn output(mut self, material: MaterialId, rate: f64) -> Self {
        self.outputs.insert(material, rate);
        self
    }

    pub fn modal_efficiency(mut self) -> Self {
        self.modal_efficiency = true;
        self
    }

    /// Build the node at full efficiency
    pub fn build(self) -> Result<ProductionNode> {
        ProductionNode::new(self, 1.0)
    }
}

/// An immutable building with its steady-state rates.
///
/// Cloning is cheap; all clones share the same definition. Equality and
/// hashing only look at the id.
#[derive(Debug, Clone)]
pub struct ProductionNode {
    inner: Arc<NodeInner>,
}

#[derive(Debug)]
struct NodeInner {
    def: NodeDef,
    efficiency: f64,
    inputs: RateMap,
    outputs: RateMap,
}

impl ProductionNode {
    /// Build a node, scaling its input and output rates by `efficiency`.
    ///
    /// Fails with [`Error::Configuration`] when the building has no
    /// efficiency modes and `efficiency` is not 1.0.
    pub fn new(def: NodeDef, efficiency: f64) -> Result<Self> {
        if !def.modal_efficiency && efficiency != 1.0 {
            return Err(Error::Configuration {
                node: def.name,
                efficiency,
            });
        }

        let scale = |rates: &RateMap| -> RateMap {
            rates
                .iter()
                .map(|(material, rate)| (*material, rate * efficiency))
                .collect()
        };
        let inputs = scale(&def.inputs);
        let outputs = scale(&def.outputs);

        Ok(Self {
            inner: Arc::new(NodeInner {
                def,
                efficiency,
                inputs,
                outputs,
            }),
        })
    }

    /// The same building run at another efficiency
    pub fn with_efficiency(&self, efficiency: f64) -> Result<Self> {
        Self::new(self.inner.def.clone(), efficiency)
    }

    pub fn id(&self) -> NodeId {
        self.inner.def.id
    }

    pub fn name(&self) -> &str {
        &self.inner.def.name
    }

    pub fn power(&self) -> f64 {
        self.inner.def.power
    }

    pub fn size(&self) -> u8 {
        self.inner.def.size
    }

    pub fn efficiency(&self) -> f64 {
        self.inner.efficiency
    }

    pub fn inputs(&self) -> &RateMap {
        &self.inner.inputs
    }

    pub fn outputs(&self) -> &RateMap {
        &self.inner.outputs
    }

    pub fn definition(&self) -> &NodeDef {
        &self.inner.def
    }

    /// Signed contribution of one building: outputs positive, inputs
    /// negative, power under [`POWER`].
    pub fn net_rates(&self) -> impl Iterator<Item = (MaterialId, f64)> + '_ {
        self.outputs()
            .iter()
            .map(|(m, r)| (*m, *r))
            .chain(self.inputs().iter().map(|(m, r)| (*m, -*r)))
            .chain(std::iter::once((POWER, self.power())))
    }
}

impl PartialEq for ProductionNode {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ProductionNode {}

impl Hash for ProductionNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for ProductionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lowercased name with separators stripped, so `Phase_fabric`,
/// `phase-fabric` and `phaseFabric` compare equal.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const COAL: MaterialId = MaterialId(4);
    const WATER: MaterialId = MaterialId(16);
    const OIL: MaterialId = MaterialId(18);

    fn extractor() -> NodeDef {
        NodeDef::new(207, "Oil Extractor", -180.0, 3)
            .input(COAL, 1.0)
            .input(WATER, 9.0)
            .output(OIL, 15.0)
            .modal_efficiency()
    }

    #[test]
    fn efficiency_scales_inputs_and_outputs() {
        let node = ProductionNode::new(extractor(), 0.5).unwrap();
        assert_eq!(node.inputs()[&WATER], 4.5);
        assert_eq!(node.outputs()[&OIL], 7.5);
        assert_eq!(node.power(), -180.0);

        let full = node.with_efficiency(1.0).unwrap();
        assert_eq!(full.outputs()[&OIL], 15.0);
    }

    #[test]
    fn efficiency_without_modes_is_rejected() {
        let def = NodeDef::new(701, "Graphite Press", 0.0, 2).input(COAL, 1.33);
        let err = ProductionNode::new(def.clone(), 0.8).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(def.build().is_ok());
    }

    #[test]
    fn nodes_compare_by_id_only() {
        let a = extractor().build().unwrap();
        let b = NodeDef::new(207, "Renamed", 0.0, 1).build().unwrap();
        assert_eq!(a, b);

        let materials = [Material::new(1, "Copper").ore(1), Material::new(1, "Other")];
        assert_eq!(materials[0], materials[1]);
    }

    #[test]
    fn net_rates_sign_inputs_negative() {
        let node = extractor().build().unwrap();
        let net: RateMap = node.net_rates().collect();
        assert_eq!(net[&OIL], 15.0);
        assert_eq!(net[&WATER], -9.0);
        assert_eq!(net[&POWER], -180.0);
    }

    #[test]
    fn normalize_ignores_case_and_separators() {
        assert_eq!(normalize_name("Phase_fabric"), "phasefabric");
        assert_eq!(normalize_name("phase-fabric"), normalize_name("phaseFabric"));
    }
}
