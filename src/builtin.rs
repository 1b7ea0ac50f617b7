//! Built-in Mindustry (Serpulo) catalog
//!
//! Rates are per second at full efficiency. Node ids follow the in-game
//! keyboard shortcut numbering.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::models::{Material, MaterialId, NodeDef, POWER};

pub const COPPER: MaterialId = MaterialId(1);
pub const GRAPHITE: MaterialId = MaterialId(2);
pub const SILICON: MaterialId = MaterialId(3);
pub const COAL: MaterialId = MaterialId(4);
pub const SAND: MaterialId = MaterialId(5);
pub const METAGLASS: MaterialId = MaterialId(6);
pub const TITANIUM: MaterialId = MaterialId(7);
pub const PLASTANIUM: MaterialId = MaterialId(8);
pub const THORIUM: MaterialId = MaterialId(9);
pub const PHASE_FABRIC: MaterialId = MaterialId(10);
pub const SURGE_ALLOY: MaterialId = MaterialId(11);
pub const SCRAP: MaterialId = MaterialId(12);
pub const SPORE_POD: MaterialId = MaterialId(13);
pub const PYRATITE: MaterialId = MaterialId(14);
pub const BLAST_COMPOUND: MaterialId = MaterialId(15);
pub const WATER: MaterialId = MaterialId(16);
pub const SLAG: MaterialId = MaterialId(17);
pub const OIL: MaterialId = MaterialId(18);
pub const CRYOFLUID: MaterialId = MaterialId(19);
pub const LEAD: MaterialId = MaterialId(20);

pub fn materials() -> Vec<Material> {
    vec![
        Material::new(POWER.0, "Power"),
        Material::new(COPPER.0, "Copper").ore(1),
        Material::new(LEAD.0, "Lead").ore(1),
        Material::new(GRAPHITE.0, "Graphite"),
        Material::new(SILICON.0, "Silicon"),
        Material::new(COAL.0, "Coal").ore(2),
        Material::new(SAND.0, "Sand").ore(0),
        Material::new(METAGLASS.0, "Metaglass"),
        Material::new(TITANIUM.0, "Titanium").ore(3),
        Material::new(PLASTANIUM.0, "Plastanium"),
        Material::new(THORIUM.0, "Thorium").ore(4),
        Material::new(PHASE_FABRIC.0, "Phase_fabric"),
        Material::new(SURGE_ALLOY.0, "Surge_alloy"),
        Material::new(SCRAP.0, "Scrap").ore(0),
        Material::new(SPORE_POD.0, "Spore_pod"),
        Material::new(PYRATITE.0, "Pyratite"),
        Material::new(BLAST_COMPOUND.0, "Blast_compound"),
        Material::new(WATER.0, "Water").liquid().natural(),
        Material::new(SLAG.0, "Slag").liquid(),
        Material::new(OIL.0, "Oil").liquid().natural(),
        Material::new(CRYOFLUID.0, "Cryofluid").liquid(),
    ]
}

/// Factories first, then generators. Within each material's source list
/// the later entry is the more advanced one.
pub fn node_defs() -> Vec<NodeDef> {
    // Separator output ratio 5:3:2:2 at .58/s overall
    const SEPARATOR_UNIT: f64 = 0.0483;
    // Disassembler output ratio 2:4:2:1 at .25/s overall
    const DISASSEMBLER_UNIT: f64 = 0.0278;

    vec![
        // Drills that behave like factories
        NodeDef::new(205, "Water Extractor", -90.0, 2)
            .output(WATER, 6.6)
            .modal_efficiency(),
        NodeDef::new(206, "Cultivator", -80.0, 2)
            .input(WATER, 18.0)
            .output(SPORE_POD, 0.6)
            .modal_efficiency(),
        NodeDef::new(207, "Oil Extractor", -180.0, 3)
            .input(SAND, 1.0)
            .input(WATER, 9.0)
            .output(OIL, 15.0)
            .modal_efficiency(),
        // Crafting
        NodeDef::new(701, "Graphite Press", 0.0, 2)
            .input(COAL, 1.33)
            .output(GRAPHITE, 0.66),
        NodeDef::new(702, "Multi Press", -108.0, 3)
            .input(COAL, 6.0)
            .input(WATER, 6.0)
            .output(GRAPHITE, 4.0),
        NodeDef::new(703, "Silicon Smelter", -30.0, 2)
            .input(COAL, 1.5)
            .input(SAND, 3.0)
            .output(SILICON, 1.5),
        NodeDef::new(704, "Silicon Crucible", -240.0, 3)
            .input(COAL, 2.66)
            .input(SAND, 4.0)
            .input(PYRATITE, 0.66)
            .output(SILICON, 5.33)
            .modal_efficiency(),
        NodeDef::new(705, "Kiln", -36.0, 2)
            .input(LEAD, 2.0)
            .input(SAND, 2.0)
            .output(METAGLASS, 2.0),
        NodeDef::new(706, "Plastanium Compressor", -180.0, 2)
            .input(TITANIUM, 2.0)
            .input(OIL, 15.0)
            .output(PLASTANIUM, 1.0),
        NodeDef::new(707, "Phase Weaver", -300.0, 2)
            .input(THORIUM, 2.0)
            .input(SAND, 5.0)
            .output(PHASE_FABRIC, 0.5),
        NodeDef::new(708, "Surge Smelter", -240.0, 3)
            .input(COPPER, 2.4)
            .input(LEAD, 3.2)
            .input(SILICON, 2.4)
            .input(TITANIUM, 1.6)
            .output(SURGE_ALLOY, 0.8),
        NodeDef::new(709, "Cryofluid Mixer", -60.0, 2)
            .input(WATER, 12.0)
            .input(TITANIUM, 0.5)
            .output(CRYOFLUID, 12.0),
        NodeDef::new(710, "Pyratite Mixer", -12.0, 2)
            .input(COAL, 0.75)
            .input(LEAD, 1.5)
            .input(SAND, 1.5)
            .output(PYRATITE, 0.75),
        NodeDef::new(711, "Blast Mixer", -24.0, 2)
            .input(PYRATITE, 0.75)
            .input(SPORE_POD, 0.75)
            .output(BLAST_COMPOUND, 0.75),
        NodeDef::new(712, "Melter", -60.0, 1)
            .input(SCRAP, 6.0)
            .output(SLAG, 12.0),
        NodeDef::new(713, "Separator", 0.0, 2)
            .input(SLAG, 4.0)
            .output(COPPER, 5.0 * SEPARATOR_UNIT)
            .output(LEAD, 3.0 * SEPARATOR_UNIT)
            .output(TITANIUM, 2.0 * SEPARATOR_UNIT)
            .output(GRAPHITE, 2.0 * SEPARATOR_UNIT),
        NodeDef::new(714, "Disassembler", 0.0, 3)
            .input(SCRAP, 4.0)
            .input(SLAG, 7.2)
            .output(GRAPHITE, 2.0 * DISASSEMBLER_UNIT)
            .output(SAND, 4.0 * DISASSEMBLER_UNIT)
            .output(TITANIUM, 2.0 * DISASSEMBLER_UNIT)
            .output(THORIUM, DISASSEMBLER_UNIT),
        NodeDef::new(715, "Spore Press", -42.0, 2)
            .input(SPORE_POD, 3.0)
            .output(OIL, 18.0),
        NodeDef::new(716, "Pulverizer", -30.0, 1)
            .input(SCRAP, 1.5)
            .output(SAND, 1.5),
        NodeDef::new(717, "Coal Centrifuge", -42.0, 2)
            .input(OIL, 6.0)
            .output(COAL, 2.0),
        // Generators
        NodeDef::new(507, "Combustion Generator", 60.0, 1).input(COAL, 0.5),
        NodeDef::new(508, "Thermal Generator", 60.0, 2)
            .input(WATER, 1.0)
            .modal_efficiency(),
        NodeDef::new(509, "Steam Generator", 330.0, 2)
            .input(SPORE_POD, 1.0 / 1.5)
            .input(WATER, 6.0),
        NodeDef::new(510, "Differential Generator", 1080.0, 3)
            .input(PYRATITE, 1.0 / 3.66)
            .input(CRYOFLUID, 6.0),
        NodeDef::new(511, "RTG Generator", 270.0, 2).input(THORIUM, 1.0 / 14.0),
        NodeDef::new(512, "Solar Panel", 6.0, 1),
        NodeDef::new(513, "Large Solar Panel", 78.0, 3),
        // Rounded up from 2.4 cryofluid for headroom
        NodeDef::new(514, "Thorium Reactor", 900.0, 3)
            .input(THORIUM, 1.0 / 6.0)
            .input(CRYOFLUID, 2.5),
        NodeDef::new(515, "Impact Reactor", 7800.0, 4)
            .input(BLAST_COMPOUND, 1.0 / 2.33)
            .input(CRYOFLUID, 15.0),
    ]
}

/// The full built-in catalog
pub fn catalog() -> Result<Catalog> {
    let nodes = node_defs()
        .into_iter()
        .map(NodeDef::build)
        .collect::<Result<Vec<_>>>()?;
    Catalog::new(materials(), nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeId;

    #[test]
    fn builtin_catalog_is_consistent() {
        let catalog = catalog().unwrap();
        assert_eq!(catalog.materials().len(), 21);
        assert_eq!(catalog.nodes().len(), 29);
        assert_eq!(catalog.generators().count(), 9);
        assert_eq!(catalog.material(LEAD).unwrap().name, "Lead");
        assert_ne!(LEAD, COPPER);
    }

    #[test]
    fn modal_buildings_accept_other_efficiencies() {
        let catalog = catalog().unwrap();
        let extractor = catalog.node(NodeId(205)).unwrap();
        assert_eq!(extractor.with_efficiency(0.5).unwrap().outputs()[&WATER], 3.3);
        assert!(catalog.node(NodeId(708)).unwrap().with_efficiency(0.5).is_err());
    }
}
