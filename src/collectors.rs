//! Drills and pumps: buildings that gather natural materials from the tiles
//! they sit on

use std::fmt;

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::models::{Material, POWER, RateMap};

/// Speed multiplier for a water-boosted drill
pub const DEFAULT_BOOST: f64 = 2.56;

#[derive(Debug, Clone, PartialEq)]
pub struct Drill {
    pub id: u32,
    pub name: &'static str,
    pub power: f64,
    pub size: u8,
    pub base_speed: f64, // Ticks per item before hardness is added
    pub max_hardness: u8,
    pub water_intake: f64,
    pub boost: f64,
    pub boosted: bool,
}

impl Drill {
    /// Items per second mined from `tiles` tiles of `material` (the full
    /// footprint when `None`)
    pub fn speed(&self, material: &Material, tiles: Option<u32>) -> Result<f64> {
        let hardness = material.hardness.ok_or_else(|| Error::NotMinable {
            material: material.name.clone(),
        })?;
        if hardness > self.max_hardness {
            return Err(Error::TooHard {
                material: material.name.clone(),
                hardness,
                drill: self.name.to_string(),
            });
        }

        let tiles = tiles.unwrap_or_else(|| u32::from(self.size).pow(2));
        let boost = if self.boosted { self.boost } else { 1.0 };
        Ok(60.0 / (self.base_speed + 50.0 * f64::from(hardness)) * f64::from(tiles) * boost)
    }

    /// Tiles of `material` needed to reach `target_rate`
    pub fn required_tiles(&self, material: &Material, target_rate: f64) -> Result<f64> {
        Ok(target_rate / self.speed(material, Some(1))?)
    }

    pub fn boosted(mut self) -> Self {
        self.boosted = true;
        self
    }

    /// Water drawn per second by one drill, when boosted
    pub fn water_input(&self) -> Option<f64> {
        self.boosted.then_some(self.water_intake)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pump {
    pub id: u32,
    pub name: &'static str,
    pub power: f64,
    pub size: u8,
    pub base_speed: f64, // Units per second per tile
}

impl Pump {
    pub fn speed(&self, material: &Material, tiles: Option<u32>) -> Result<f64> {
        if !(material.is_liquid && material.is_natural) {
            return Err(Error::NotPumpable {
                material: material.name.clone(),
            });
        }
        let tiles = tiles.unwrap_or_else(|| u32::from(self.size).pow(2));
        Ok(self.base_speed * f64::from(tiles))
    }

    pub fn required_tiles(&self, material: &Material, target_rate: f64) -> Result<f64> {
        Ok(target_rate / self.speed(material, Some(1))?)
    }
}

pub fn drills() -> Vec<Drill> {
    let drill = |id: u32,
                 name: &'static str,
                 power: f64,
                 size: u8,
                 base_speed: f64,
                 max_hardness: u8,
                 water_intake: f64| Drill {
        id,
        name,
        power,
        size,
        base_speed,
        max_hardness,
        water_intake,
        boost: DEFAULT_BOOST,
        boosted: false,
    };
    vec![
        drill(201, "Mechanical Drill", 0.0, 2, 600.0, 2, 3.0),
        drill(202, "Pneumatic Drill", 0.0, 2, 400.0, 3, 3.6),
        drill(203, "Laser Drill", -60.0, 3, 280.0, 4, 4.8),
        Drill {
            boost: 3.24,
            ..drill(204, "Airblast Drill", -60.0, 4, 280.0, 4, 3.0)
        },
    ]
}

pub fn pumps() -> Vec<Pump> {
    vec![
        Pump {
            id: 401,
            name: "Mechanical Pump",
            power: 0.0,
            size: 1,
            base_speed: 7.0,
        },
        Pump {
            id: 402,
            name: "Rotary Pump",
            power: -18.0,
            size: 2,
            base_speed: 12.2,
        },
        Pump {
            id: 403,
            name: "Impulse Pump",
            power: -78.0,
            size: 3,
            base_speed: 13.2,
        },
    ]
}

/// Ore or liquid tiles needed to gather one raw input
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequirement {
    pub material: String,
    pub rate: f64,
    pub collector: &'static str,
    pub tiles: f64,
    /// Number of collectors covering those tiles
    pub collectors: f64,
    /// Water drawn by boosted drills
    pub water: f64,
}

impl fmt::Display for TileRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {:.3}/s: {:.1} tiles under {:.2}x {}",
            self.material, self.rate, self.tiles, self.collectors, self.collector
        )?;
        if self.water > 0.0 {
            write!(f, " (+{:.2} Water/s)", self.water)?;
        }
        Ok(())
    }
}

/// Tiles needed to gather every deficit in `demand` that can be mined or
/// pumped, using the strongest collector that handles each material.
/// Manufactured materials and power are skipped.
pub fn tile_requirements(
    catalog: &Catalog,
    demand: &RateMap,
    boosted: bool,
) -> Vec<TileRequirement> {
    let drills: Vec<Drill> = drills()
        .into_iter()
        .map(|drill| if boosted { drill.boosted() } else { drill })
        .collect();
    let pumps = pumps();

    let mut report = Vec::new();
    for (id, rate) in demand {
        if *id == POWER || *rate >= 0.0 {
            continue;
        }
        let Some(material) = catalog.material(*id) else {
            continue;
        };
        let rate = -rate;

        let requirement = if material.hardness.is_some() {
            drills.iter().rev().find_map(|drill| {
                let tiles = drill.required_tiles(material, rate).ok()?;
                let collectors = tiles / f64::from(drill.size).powi(2);
                Some(TileRequirement {
                    material: material.name.clone(),
                    rate,
                    collector: drill.name,
                    tiles,
                    collectors,
                    water: drill.water_input().unwrap_or(0.0) * collectors,
                })
            })
        } else {
            pumps.last().and_then(|pump| {
                let tiles = pump.required_tiles(material, rate).ok()?;
                Some(TileRequirement {
                    material: material.name.clone(),
                    rate,
                    collector: pump.name,
                    tiles,
                    collectors: tiles / f64::from(pump.size).powi(2),
                    water: 0.0,
                })
            })
        };
        report.extend(requirement);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;

    fn material(name: &str) -> Material {
        builtin::materials()
            .into_iter()
            .find(|m| m.name == name)
            .unwrap()
    }

    #[test]
    fn drill_speed_depends_on_hardness_and_tiles() {
        let drills = drills();
        let mechanical = &drills[0];
        let copper = material("Copper");

        let full = mechanical.speed(&copper, None).unwrap();
        assert!((full - 60.0 / 650.0 * 4.0).abs() < 1e-12);
        let one = mechanical.speed(&copper, Some(1)).unwrap();
        assert!((mechanical.required_tiles(&copper, full).unwrap() - 4.0).abs() < 1e-9);
        assert!((full - 4.0 * one).abs() < 1e-12);

        let boosted = mechanical.clone().boosted().speed(&copper, None).unwrap();
        assert!((boosted - full * DEFAULT_BOOST).abs() < 1e-12);
    }

    #[test]
    fn airblast_drill_has_stronger_boost() {
        let airblast = drills()[3].clone().boosted();
        let sand = material("Sand");
        let speed = airblast.speed(&sand, Some(1)).unwrap();
        assert!((speed - 60.0 / 280.0 * 3.24).abs() < 1e-12);
    }

    #[test]
    fn drills_reject_soft_limits_and_non_ores() {
        let drills = drills();
        let mechanical = &drills[0];
        assert!(matches!(
            mechanical.speed(&material("Titanium"), None),
            Err(Error::TooHard { hardness: 3, .. })
        ));
        assert!(matches!(
            mechanical.speed(&material("Silicon"), None),
            Err(Error::NotMinable { .. })
        ));
    }

    #[test]
    fn pumps_only_move_natural_liquids() {
        let pumps = pumps();
        let rotary = &pumps[1];
        let water = material("Water");
        assert!((rotary.speed(&water, None).unwrap() - 48.8).abs() < 1e-9);
        assert!((rotary.required_tiles(&water, 24.4).unwrap() - 2.0).abs() < 1e-9);
        assert!(rotary.speed(&material("Slag"), None).is_err());
        assert!(rotary.speed(&material("Sand"), None).is_err());
    }

    #[test]
    fn only_boosted_drills_draw_water() {
        let drills = drills();
        assert_eq!(drills[1].water_input(), None);
        assert_eq!(drills[1].clone().boosted().water_input(), Some(3.6));
    }

    #[test]
    fn tile_report_covers_minable_and_pumpable_deficits() {
        let catalog = builtin::catalog().unwrap();
        let demand = RateMap::from([
            (POWER, -60.0),
            (builtin::COPPER, -2.4),
            (builtin::SILICON, -1.0),
            (builtin::WATER, -12.0),
            (builtin::SAND, 3.0),
        ]);

        let report = tile_requirements(&catalog, &demand, false);
        assert_eq!(report.len(), 2);

        let copper = &report[0];
        assert_eq!(copper.collector, "Airblast Drill");
        assert!((copper.tiles - 2.4 / (60.0 / 330.0)).abs() < 1e-9);
        assert!((copper.collectors - copper.tiles / 16.0).abs() < 1e-12);
        assert_eq!(copper.water, 0.0);

        let water = &report[1];
        assert_eq!(water.collector, "Impulse Pump");
        assert!((water.tiles - 12.0 / 13.2).abs() < 1e-9);
        assert!(water.to_string().starts_with("Water @ 12.000/s"));
    }

    #[test]
    fn boosted_tile_report_needs_fewer_tiles_and_some_water() {
        let catalog = builtin::catalog().unwrap();
        let demand = RateMap::from([(builtin::THORIUM, -1.0)]);

        let plain = &tile_requirements(&catalog, &demand, false)[0];
        let boosted = &tile_requirements(&catalog, &demand, true)[0];
        assert!((plain.tiles / boosted.tiles - 3.24).abs() < 1e-9);
        assert!((boosted.water - 3.0 * boosted.collectors).abs() < 1e-12);
        assert!(boosted.to_string().contains("Water/s"));
    }
}
