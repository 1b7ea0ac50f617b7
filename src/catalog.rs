//! The building catalog: every known material and production node

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::{normalize_name, Material, MaterialId, NodeId, ProductionNode};

/// Materials and buildings known to the calculator, in declaration order.
///
/// Built once at startup and passed by reference to everything that needs
/// it. To change the catalog, build a new one (and a new
/// [`SourceIndex`](crate::SourceIndex) from it).
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    materials: Vec<Material>,
    material_index: HashMap<MaterialId, usize>,
    nodes: Vec<ProductionNode>,
    node_index: HashMap<NodeId, usize>,
}

impl Catalog {
    /// Validate and index a catalog.
    ///
    /// Ids must be unique, and every material a node consumes or produces
    /// must be registered.
    pub fn new(materials: Vec<Material>, nodes: Vec<ProductionNode>) -> Result<Self> {
        let mut material_index = HashMap::with_capacity(materials.len());
        for (i, material) in materials.iter().enumerate() {
            if material_index.insert(material.id, i).is_some() {
                return Err(Error::DuplicateId {
                    kind: "material",
                    id: material.id.0,
                });
            }
        }

        let mut node_index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if node_index.insert(node.id(), i).is_some() {
                return Err(Error::DuplicateId {
                    kind: "node",
                    id: node.id().0,
                });
            }
            let unknown = node
                .inputs()
                .keys()
                .chain(node.outputs().keys())
                .find(|material| !material_index.contains_key(*material));
            if let Some(material) = unknown {
                return Err(Error::UnknownMaterial {
                    node: node.id(),
                    material: *material,
                });
            }
        }

        Ok(Self {
            materials,
            material_index,
            nodes,
            node_index,
        })
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn nodes(&self) -> &[ProductionNode] {
        &self.nodes
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.material_index.get(&id).map(|&i| &self.materials[i])
    }

    pub fn node(&self, id: NodeId) -> Option<&ProductionNode> {
        self.node_index.get(&id).map(|&i| &self.nodes[i])
    }

    /// Look up a material ignoring case and separators
    pub fn material_by_name(&self, name: &str) -> Option<&Material> {
        let key = normalize_name(name);
        self.materials.iter().find(|m| normalize_name(&m.name) == key)
    }

    /// Look up a building ignoring case and separators
    pub fn node_by_name(&self, name: &str) -> Option<&ProductionNode> {
        let key = normalize_name(name);
        self.nodes.iter().find(|n| normalize_name(n.name()) == key)
    }

    /// Display name of a material, falling back to its id
    pub fn material_name(&self, id: MaterialId) -> String {
        self.material(id)
            .map_or_else(|| id.to_string(), |m| m.name.clone())
    }

    /// Unregistered materials count as manufactured
    pub fn is_natural(&self, id: MaterialId) -> bool {
        self.material(id).is_some_and(|m| m.is_natural)
    }

    /// Buildings with a positive power delta, in declaration order
    pub fn generators(&self) -> impl Iterator<Item = &ProductionNode> {
        self.nodes.iter().filter(|node| node.power() > 0.0)
    }
}
