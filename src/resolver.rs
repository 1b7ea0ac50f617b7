//! Upstream resolution: grow a flow group until every manufactured input
//! is supplied by a building in the group.
//!
//! The algorithm is greedy. Each round picks one material still in deficit
//! and attaches just enough of its source building to cover it, which may
//! open new deficits further upstream. Natural materials are left as unmet
//! demand unless an override names a building for them.
//!
//! Production cycles can keep reopening deficits forever, so resolution is
//! capped by [`ResolveOptions::max_iterations`].

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::flow::{FlowGroup, EPSILON};
use crate::models::{MaterialId, NodeId, ProductionNode};
use crate::sources::SourceIndex;

pub const DEFAULT_MAX_ITERATIONS: usize = 1_000;

/// When to round attached buildings up to whole units
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Rounding {
    #[default]
    Fractional,
    WholeUnits,
    /// Round only the listed buildings
    PerNode(BTreeSet<NodeId>),
}

impl Rounding {
    fn applies_to(&self, node: NodeId) -> bool {
        match self {
            Rounding::Fractional => false,
            Rounding::WholeUnits => true,
            Rounding::PerNode(nodes) => nodes.contains(&node),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Preferred source per material, used instead of the index's default
    pub overrides: BTreeMap<MaterialId, ProductionNode>,
    pub rounding: Rounding,
    /// Give up after this many attached sources. `None` never gives up.
    pub max_iterations: Option<usize>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            overrides: BTreeMap::new(),
            rounding: Rounding::default(),
            max_iterations: Some(DEFAULT_MAX_ITERATIONS),
        }
    }
}

impl ResolveOptions {
    pub fn with_override(mut self, material: MaterialId, node: ProductionNode) -> Self {
        self.overrides.insert(material, node);
        self
    }

    pub fn with_rounding(mut self, rounding: Rounding) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

pub struct Resolver<'a> {
    catalog: &'a Catalog,
    sources: &'a SourceIndex,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog, sources: &'a SourceIndex) -> Self {
        Self { catalog, sources }
    }

    /// Attach upstream suppliers to `group` until no manufactured (or
    /// overridden) material is left in deficit.
    ///
    /// Deficits are resolved in ascending material id order. A source that
    /// produces none of the group's deficits is skipped, and its material is
    /// left unresolved.
    ///
    /// # Errors
    ///
    /// - [`Error::NoSourceFound`] if a manufactured material has no producer
    /// - [`Error::ResolutionDidNotConverge`] if the iteration cap is hit
    pub fn resolve(&self, group: &FlowGroup, options: &ResolveOptions) -> Result<FlowGroup> {
        let mut current = group.clone();
        let mut skipped = BTreeSet::new();
        let mut iterations = 0;

        while let Some(material) = self.next_target(&current, options, &skipped) {
            if options.max_iterations.is_some_and(|cap| iterations >= cap) {
                return Err(Error::ResolutionDidNotConverge { iterations });
            }
            iterations += 1;

            let source = self.source_for(material, options)?;
            let next = if options.rounding.applies_to(source.id()) {
                match current.ceiling_ratio(source) {
                    Ok(ratio) if ratio.is_finite() => {
                        debug!(
                            material = %self.catalog.material_name(material),
                            node = source.name(),
                            ratio,
                            "attaching whole-unit source"
                        );
                        current.add(&source.scale(ratio))
                    }
                    Ok(_) | Err(Error::UnsatisfiableDemand) => current.clone(),
                    Err(e) => return Err(e),
                }
            } else {
                debug!(
                    material = %self.catalog.material_name(material),
                    node = source.name(),
                    "combining source"
                );
                current.combine(source)
            };

            if next == current {
                warn!(
                    material = %self.catalog.material_name(material),
                    node = source.name(),
                    "source supplies none of the deficit, leaving it unresolved"
                );
                skipped.insert(material);
            }
            current = next;
        }

        info!(
            iterations,
            nodes = current.nodes().count(),
            unresolved = skipped.len(),
            "upstream resolution finished"
        );
        Ok(current)
    }

    fn next_target(
        &self,
        group: &FlowGroup,
        options: &ResolveOptions,
        skipped: &BTreeSet<MaterialId>,
    ) -> Option<MaterialId> {
        group
            .rates()
            .iter()
            .filter(|(_, rate)| **rate <= -EPSILON)
            .map(|(material, _)| *material)
            .filter(|material| !skipped.contains(material))
            .find(|material| {
                options.overrides.contains_key(material) || !self.catalog.is_natural(*material)
            })
    }

    fn source_for<'s>(
        &'s self,
        material: MaterialId,
        options: &'s ResolveOptions,
    ) -> Result<&'s ProductionNode> {
        options
            .overrides
            .get(&material)
            .or_else(|| self.sources.preferred(material))
            .ok_or(Error::NoSourceFound { material })
    }
}
