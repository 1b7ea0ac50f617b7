//! Which buildings can produce each material

use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::models::{MaterialId, ProductionNode, POWER};

/// Read-only map from material to the buildings that output it, in
/// catalog declaration order. Power maps to the catalog's generators.
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    sources: HashMap<MaterialId, Vec<ProductionNode>>,
}

impl SourceIndex {
    pub fn build(catalog: &Catalog) -> Self {
        let mut sources: HashMap<MaterialId, Vec<ProductionNode>> = HashMap::new();

        let generators: Vec<_> = catalog.generators().cloned().collect();
        if !generators.is_empty() {
            sources.insert(POWER, generators);
        }

        for node in catalog.nodes() {
            for material in node.outputs().keys() {
                sources.entry(*material).or_default().push(node.clone());
            }
        }

        Self { sources }
    }

    /// Every known producer of `material`, oldest first
    pub fn sources(&self, material: MaterialId) -> &[ProductionNode] {
        self.sources.get(&material).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The default producer: the last (most advanced) one declared
    pub fn preferred(&self, material: MaterialId) -> Option<&ProductionNode> {
        self.sources(material).last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{self, COAL, GRAPHITE, SCRAP, SILICON};
    use crate::models::NodeId;

    #[test]
    fn sources_follow_declaration_order() {
        let catalog = builtin::catalog().unwrap();
        let index = SourceIndex::build(&catalog);

        let graphite: Vec<_> = index.sources(GRAPHITE).iter().map(|n| n.id()).collect();
        assert_eq!(
            graphite,
            vec![NodeId(701), NodeId(702), NodeId(713), NodeId(714)]
        );
        assert_eq!(index.preferred(SILICON).unwrap().id(), NodeId(704));
        assert_eq!(index.preferred(COAL).unwrap().id(), NodeId(717));
    }

    #[test]
    fn power_sources_are_generators() {
        let catalog = builtin::catalog().unwrap();
        let index = SourceIndex::build(&catalog);

        assert_eq!(index.sources(POWER).len(), 9);
        assert_eq!(index.preferred(POWER).unwrap().id(), NodeId(515));
    }

    #[test]
    fn unproduced_material_has_no_sources() {
        let index = SourceIndex::build(&builtin::catalog().unwrap());
        assert!(index.sources(SCRAP).is_empty());
        assert!(index.preferred(SCRAP).is_none());
    }
}
