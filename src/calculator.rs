//! Production chain calculator logic

use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;

use crate::catalog::Catalog;
use crate::flow::FlowGroup;
use crate::models::{MaterialId, NodeId, POWER, ProductionNode, RateMap};
use crate::resolver::{ResolveOptions, Resolver};
use crate::sources::SourceIndex;

/// What the caller wants built: buildings with counts, plus raw material
/// rates (negative = demand, positive = free supply)
#[derive(Debug, Clone, Default)]
pub struct PlanTargets {
    pub nodes: Vec<(NodeId, f64)>,
    pub materials: Vec<(MaterialId, f64)>,
}

/// Calculate the production chain needed to run the target buildings and
/// meet the target material rates.
///
/// Returns the resolved flow group: the targets plus every upstream
/// building needed to supply their manufactured inputs.
pub fn calculate_production_chain(
    catalog: &Catalog,
    index: &SourceIndex,
    targets: &PlanTargets,
    options: &ResolveOptions,
) -> Result<FlowGroup> {
    let mut nodes = Vec::with_capacity(targets.nodes.len());
    for (id, count) in &targets.nodes {
        let node = catalog
            .node(*id)
            .ok_or_else(|| anyhow!("Unknown building id {}", id.0))?;
        nodes.push((node.clone(), *count));
    }

    let start = FlowGroup::from_parts(nodes, targets.materials.iter().copied());
    let resolved = Resolver::new(catalog, index)
        .resolve(&start, options)
        .context("Failed to resolve upstream production")?;
    Ok(resolved)
}

/// Parse a building term: `ID` or `IDxCOUNT` (e.g. `708x12`)
pub fn parse_node_term(term: &str) -> Result<(NodeId, f64)> {
    let re = Regex::new(r"^\s*(\d+)\s*(?:[x*]\s*(\d+(?:\.\d+)?))?\s*$")?;
    let cap = re
        .captures(term)
        .ok_or_else(|| anyhow!("Expected ID or IDxCOUNT, got '{}'", term))?;

    let id = cap[1].parse::<u32>()?;
    let count = match cap.get(2) {
        Some(count) => count.as_str().parse::<f64>()?,
        None => 1.0,
    };
    Ok((NodeId(id), count))
}

/// Parse a material rate term: `NAME=RATE` (e.g. `Silicon=3`)
pub fn parse_rate_term(catalog: &Catalog, term: &str) -> Result<(MaterialId, f64)> {
    let (name, value) = split_term(term)?;
    let material = catalog
        .material_by_name(&name)
        .ok_or_else(|| anyhow!("Unknown material '{}'", name))?;
    let rate = value
        .parse::<f64>()
        .with_context(|| format!("Invalid rate in '{}'", term))?;
    Ok((material.id, rate))
}

/// Parse a source override: `MATERIAL=NODE`, where the node is given by id
/// or name (e.g. `Silicon=703`, `Coal=Coal Centrifuge`)
pub fn parse_override_term(catalog: &Catalog, term: &str) -> Result<(MaterialId, ProductionNode)> {
    let (name, value) = split_term(term)?;
    let material = catalog
        .material_by_name(&name)
        .ok_or_else(|| anyhow!("Unknown material '{}'", name))?;

    let node = match value.parse::<u32>() {
        Ok(id) => catalog.node(NodeId(id)),
        Err(_) => catalog.node_by_name(&value),
    }
    .ok_or_else(|| anyhow!("Unknown building '{}'", value))?;

    let produces = if material.id == POWER {
        node.power() > 0.0
    } else {
        node.outputs().contains_key(&material.id)
    };
    if !produces {
        bail!("{} does not produce {}", node.name(), material.name);
    }
    Ok((material.id, node.clone()))
}

fn split_term(term: &str) -> Result<(String, String)> {
    let re = Regex::new(r"^\s*([A-Za-z][\w\s-]*?)\s*=\s*(\S.*?)\s*$")?;
    let cap = re
        .captures(term)
        .ok_or_else(|| anyhow!("Expected NAME=VALUE, got '{}'", term))?;
    Ok((cap[1].to_string(), cap[2].to_string()))
}

/// Format a flow group as a readable listing
pub fn format_flow_group(group: &FlowGroup, catalog: &Catalog) -> String {
    let mut output = String::new();

    output.push_str("Buildings:\n");
    for (node, count) in group.nodes() {
        let power = node.power() * count;
        let power_str = if power < 0.0 {
            format!("consumes {:.0}/s", -power)
        } else if power > 0.0 {
            format!("generates {:.0}/s", power)
        } else {
            "no power".to_string()
        };
        output.push_str(&format!(
            "  {:.2}x {} [{}] ({})\n",
            count,
            node.name(),
            node.id().0,
            power_str
        ));
    }

    output.push_str("Net flow:\n");
    for (material, rate) in group.rates() {
        output.push_str(&format!(
            "  {:<16} {:>+10.3}/s\n",
            catalog.material_name(*material),
            rate
        ));
    }

    output
}

/// Summary of a production chain calculation
#[derive(Debug)]
pub struct ChainSummary {
    pub building_counts: Vec<(String, f64)>,
    pub raw_inputs: Vec<(String, f64)>,
    pub surplus_outputs: Vec<(String, f64)>,
    pub total_power_consumption: f64,
    pub total_power_generation: f64,
    pub net_power: f64,
    pub footprint: f64,
}

impl ChainSummary {
    pub fn new(group: &FlowGroup, catalog: &Catalog) -> Self {
        let mut building_counts: Vec<_> = group
            .nodes()
            .map(|(node, count)| (node.name().to_string(), count))
            .collect();
        building_counts.sort_by(|a, b| a.0.cmp(&b.0));

        let named = |rates: RateMap| -> Vec<(String, f64)> {
            let mut list: Vec<_> = rates
                .into_iter()
                .filter(|(material, _)| *material != POWER)
                .map(|(material, rate)| (catalog.material_name(material), rate.abs()))
                .collect();
            list.sort_by(|a, b| a.0.cmp(&b.0));
            list
        };

        let mut consumption = 0.0;
        let mut generation = 0.0;
        for (node, count) in group.nodes() {
            let power = node.power() * count;
            if power < 0.0 {
                consumption += -power;
            } else {
                generation += power;
            }
        }

        ChainSummary {
            building_counts,
            raw_inputs: named(group.net_inputs()),
            surplus_outputs: named(group.net_outputs()),
            total_power_consumption: consumption,
            total_power_generation: generation,
            net_power: generation - consumption,
            footprint: group.footprint(),
        }
    }
}

impl fmt::Display for ChainSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Production Summary ===")?;
        writeln!(f)?;

        writeln!(f, "Buildings required:")?;
        for (name, count) in &self.building_counts {
            writeln!(f, "  {:.2}x {}", count, name)?;
        }
        writeln!(f)?;

        writeln!(f, "Raw inputs required:")?;
        for (name, rate) in &self.raw_inputs {
            writeln!(f, "  {} @ {:.3}/s", name, rate)?;
        }
        writeln!(f)?;

        if !self.surplus_outputs.is_empty() {
            writeln!(f, "Surplus outputs:")?;
            for (name, rate) in &self.surplus_outputs {
                writeln!(f, "  {} @ {:.3}/s", name, rate)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Power:")?;
        writeln!(f, "  Consumption: {:.0}/s", self.total_power_consumption)?;
        writeln!(f, "  Generation:  {:.0}/s", self.total_power_generation)?;
        writeln!(f, "  Net:         {:.0}/s", self.net_power)?;
        writeln!(f)?;

        writeln!(f, "Footprint: {:.0} tiles", self.footprint)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{self, COAL, SILICON};

    fn setup() -> (Catalog, SourceIndex) {
        let catalog = builtin::catalog().unwrap();
        let index = SourceIndex::build(&catalog);
        (catalog, index)
    }

    #[test]
    fn parses_node_terms() {
        assert_eq!(parse_node_term("708").unwrap(), (NodeId(708), 1.0));
        assert_eq!(parse_node_term("708x12").unwrap(), (NodeId(708), 12.0));
        assert_eq!(parse_node_term(" 703 * 2.5 ").unwrap(), (NodeId(703), 2.5));
        assert!(parse_node_term("Kiln").is_err());
        assert!(parse_node_term("708x").is_err());
    }

    #[test]
    fn parses_rate_terms_by_name() {
        let (catalog, _) = setup();
        assert_eq!(parse_rate_term(&catalog, "Silicon=3").unwrap(), (SILICON, 3.0));
        assert_eq!(
            parse_rate_term(&catalog, "phase fabric = 0.5").unwrap(),
            (builtin::PHASE_FABRIC, 0.5)
        );
        assert!(parse_rate_term(&catalog, "Unobtainium=1").is_err());
        assert!(parse_rate_term(&catalog, "Silicon=lots").is_err());
    }

    #[test]
    fn parses_override_terms_by_id_or_name() {
        let (catalog, _) = setup();
        let (material, node) = parse_override_term(&catalog, "Silicon=703").unwrap();
        assert_eq!(material, SILICON);
        assert_eq!(node.id(), NodeId(703));

        let (material, node) = parse_override_term(&catalog, "Coal=Coal Centrifuge").unwrap();
        assert_eq!(material, COAL);
        assert_eq!(node.id(), NodeId(717));

        let (material, node) = parse_override_term(&catalog, "Power=512").unwrap();
        assert_eq!(material, POWER);
        assert_eq!(node.id(), NodeId(512));

        assert!(parse_override_term(&catalog, "Silicon=701").is_err());
        assert!(parse_override_term(&catalog, "Silicon=9999").is_err());
    }

    #[test]
    fn summarizes_a_resolved_chain() {
        let (catalog, index) = setup();
        let targets = PlanTargets {
            nodes: vec![(NodeId(703), 2.0)],
            materials: vec![(POWER, 60.0)],
        };
        let group =
            calculate_production_chain(&catalog, &index, &targets, &ResolveOptions::default())
                .unwrap();
        let summary = ChainSummary::new(&group, &catalog);

        assert_eq!(summary.building_counts, vec![("Silicon Smelter".to_string(), 2.0)]);
        assert_eq!(
            summary.raw_inputs,
            vec![("Coal".to_string(), 3.0), ("Sand".to_string(), 6.0)]
        );
        assert_eq!(summary.surplus_outputs, vec![("Silicon".to_string(), 3.0)]);
        assert_eq!(summary.total_power_consumption, 60.0);
        assert_eq!(summary.net_power, -60.0);
        assert_eq!(summary.footprint, 8.0);

        let report = summary.to_string();
        assert!(report.contains("2.00x Silicon Smelter"));
        assert!(report.contains("Sand @ 6.000/s"));

        let listing = format_flow_group(&group, &catalog);
        assert!(listing.contains("Silicon Smelter [703] (consumes 60/s)"));
        assert!(!listing.contains("Power"));
    }

    #[test]
    fn unknown_target_building_is_an_error() {
        let (catalog, index) = setup();
        let targets = PlanTargets {
            nodes: vec![(NodeId(9999), 1.0)],
            materials: vec![],
        };
        assert!(
            calculate_production_chain(&catalog, &index, &targets, &ResolveOptions::default())
                .is_err()
        );
    }
}
