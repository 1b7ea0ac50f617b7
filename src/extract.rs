//! Java source extraction for Mindustry building data
//!
//! Parses block definitions (the `name = new Type("block-name"){{ ... }};`
//! initializers in `Blocks.java`) to extract building sizes, power draw and
//! per-second input/output rates.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use rusqlite::Connection;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::builtin;
use crate::db;
use crate::models::{normalize_name, Material, MaterialId, NodeDef, NodeId, POWER};

/// Game logic runs at 60 ticks per second
const TICKS_PER_SECOND: f64 = 60.0;
const DEFAULT_CRAFT_TIME: f64 = 60.0;
/// Fresh ids for extracted buildings start above the shortcut numbering
const FIRST_EXTRACTED_NODE_ID: u32 = 1000;

/// A literal like `0.5f` or `12f / 60f`
const NUMBER: &str = r"([\d.]+)f?(?:\s*/\s*([\d.]+)f?)?";

/// One material flow of an extracted block
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFlow {
    pub material: String, // Java field name, e.g. "surgeAlloy"
    pub liquid: bool,
    pub rate: f64, // per second
}

/// Extracted building data before database insertion
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractedBlock {
    pub name: String, // internal name, e.g. "silicon-smelter"
    pub kind: String, // Java type, e.g. "GenericCrafter"
    pub size: u8,
    pub power: f64,
    pub inputs: Vec<ExtractedFlow>,
    pub outputs: Vec<ExtractedFlow>,
}

impl ExtractedBlock {
    /// "silicon-smelter" -> "Silicon Smelter"
    pub fn display_name(&self) -> String {
        self.name
            .split('-')
            .filter(|word| !word.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// "surgeAlloy" -> "Surge Alloy"
fn material_display_name(field: &str) -> String {
    let mut name = String::new();
    for (i, c) in field.chars().enumerate() {
        if i == 0 {
            name.extend(c.to_uppercase());
        } else if c.is_uppercase() {
            name.push(' ');
            name.push(c);
        } else {
            name.push(c);
        }
    }
    name
}

/// Find all Java files that likely define blocks
pub fn find_source_files(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(source_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "java") {
            let content = fs::read_to_string(path).unwrap_or_default();
            if content.contains("requirements(Category.") {
                files.push(path.to_path_buf());
            }
        }
    }

    Ok(files)
}

fn number(cap: &Captures, i: usize) -> f64 {
    let value = cap
        .get(i)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);
    match cap.get(i + 1).and_then(|m| m.as_str().parse::<f64>().ok()) {
        Some(divisor) if divisor != 0.0 => value / divisor,
        _ => value,
    }
}

/// Parse every block definition in a Java source file
pub fn parse_blocks(content: &str) -> Result<Vec<ExtractedBlock>> {
    let header_re = Regex::new(r#"(\w+)\s*=\s*new\s+(\w+)\s*\(\s*"([\w-]+)"\s*\)\s*\{\{"#)?;

    let headers: Vec<_> = header_re.captures_iter(content).collect();
    let mut blocks = Vec::new();
    for (i, header) in headers.iter().enumerate() {
        let Some(whole) = header.get(0) else { continue };
        let start = whole.end();
        let next_header = headers
            .get(i + 1)
            .and_then(|h| h.get(0))
            .map_or(content.len(), |m| m.start());
        let end = content[start..next_header]
            .find("}};")
            .map_or(next_header, |offset| start + offset);

        let block = parse_block_body(&header[3], &header[2], &content[start..end])?;
        if block.inputs.is_empty() && block.outputs.is_empty() && block.power <= 0.0 {
            debug!(block = %block.name, "no material flows, skipping");
            continue;
        }
        blocks.push(block);
    }

    Ok(blocks)
}

fn parse_block_body(name: &str, kind: &str, body: &str) -> Result<ExtractedBlock> {
    let mut block = ExtractedBlock {
        name: name.to_string(),
        kind: kind.to_string(),
        size: 1,
        ..Default::default()
    };

    // Pattern: size = 2;
    let size_re = Regex::new(r"\bsize\s*=\s*(\d+)\s*;")?;
    if let Some(cap) = size_re.captures(body) {
        block.size = cap[1].parse::<u8>().unwrap_or(1);
    }

    // Pattern: craftTime = 90f; generators use itemDuration
    let craft_re = Regex::new(&format!(r"\b(?:craftTime|itemDuration)\s*=\s*{NUMBER}"))?;
    let craft_time = craft_re
        .captures(body)
        .map(|cap| number(&cap, 1))
        .filter(|t| *t > 0.0)
        .unwrap_or(DEFAULT_CRAFT_TIME);
    let per_craft = TICKS_PER_SECOND / craft_time;

    // Pattern: consumePower(0.50f) is per tick
    let power_re = Regex::new(&format!(r"consumePower\(\s*{NUMBER}\s*\)"))?;
    if let Some(cap) = power_re.captures(body) {
        block.power = -number(&cap, 1) * TICKS_PER_SECOND;
    }

    // Pattern: powerProduction = 0.1f; generation wins over consumption
    let production_re = Regex::new(&format!(r"powerProduction\s*=\s*{NUMBER}"))?;
    if let Some(cap) = production_re.captures(body) {
        block.power = number(&cap, 1) * TICKS_PER_SECOND;
    }

    let item = |material: &str, amount: f64| ExtractedFlow {
        material: material.to_string(),
        liquid: false,
        rate: amount * per_craft,
    };
    let liquid = |material: &str, per_tick: f64| ExtractedFlow {
        material: material.to_string(),
        liquid: true,
        rate: per_tick * TICKS_PER_SECOND,
    };
    let pair_re = Regex::new(r"Items\.(\w+)\s*,\s*(\d+)")?;

    // Pattern: consumeItem(Items.coal, 2) or consumeItem(Items.titanium)
    let consume_item_re = Regex::new(r"consumeItem\(\s*Items\.(\w+)\s*(?:,\s*(\d+)\s*)?\)")?;
    for cap in consume_item_re.captures_iter(body) {
        let amount = cap.get(2).map_or(1.0, |m| m.as_str().parse().unwrap_or(1.0));
        block.inputs.push(item(&cap[1], amount));
    }

    // Pattern: consumeItems(with(Items.coal, 1, Items.sand, 2))
    let consume_items_re = Regex::new(r"consumeItems\(\s*with\(([^)]*)\)\s*\)")?;
    for list in consume_items_re.captures_iter(body) {
        for cap in pair_re.captures_iter(&list[1]) {
            block.inputs.push(item(&cap[1], cap[2].parse().unwrap_or(0.0)));
        }
    }

    // Pattern: consumeLiquid(Liquids.water, 12f / 60f)
    let consume_liquid_re = Regex::new(&format!(r"consumeLiquid\(\s*Liquids\.(\w+)\s*,\s*{NUMBER}\s*\)"))?;
    for cap in consume_liquid_re.captures_iter(body) {
        block.inputs.push(liquid(&cap[1], number(&cap, 2)));
    }

    // Pattern: outputItem = new ItemStack(Items.graphite, 1)
    let output_item_re = Regex::new(r"outputItem\s*=\s*new\s+ItemStack\(\s*Items\.(\w+)\s*,\s*(\d+)\s*\)")?;
    for cap in output_item_re.captures_iter(body) {
        block.outputs.push(item(&cap[1], cap[2].parse().unwrap_or(0.0)));
    }

    // Pattern: outputItems = with(Items.copper, 5, Items.lead, 3)
    let output_items_re = Regex::new(r"outputItems\s*=\s*with\(([^)]*)\)")?;
    for list in output_items_re.captures_iter(body) {
        for cap in pair_re.captures_iter(&list[1]) {
            block.outputs.push(item(&cap[1], cap[2].parse().unwrap_or(0.0)));
        }
    }

    // Pattern: outputLiquid = new LiquidStack(Liquids.cryofluid, 12f / 60f)
    let output_liquid_re = Regex::new(&format!(
        r"outputLiquid\s*=\s*new\s+LiquidStack\(\s*Liquids\.(\w+)\s*,\s*{NUMBER}\s*\)"
    ))?;
    for cap in output_liquid_re.captures_iter(body) {
        block.outputs.push(liquid(&cap[1], number(&cap, 2)));
    }

    Ok(block)
}

/// A fresh material for a Java field name. Known Serpulo materials keep
/// their ore hardness and liquid/natural flags.
fn new_material(id: u32, flow: &ExtractedFlow) -> Material {
    let key = normalize_name(&flow.material);
    match builtin::materials()
        .into_iter()
        .find(|m| normalize_name(&m.name) == key)
    {
        Some(known) => Material { id: MaterialId(id), ..known },
        None => {
            let mut material = Material::new(id, material_display_name(&flow.material));
            material.is_liquid = flow.liquid;
            material
        }
    }
}

/// Merge extracted blocks into the stored catalog.
///
/// Blocks whose name matches a stored building reuse its id; others get
/// fresh ids. Afterwards every material no building produces is marked
/// natural, so the catalog resolves without the built-in data.
pub fn store_blocks(conn: &Connection, blocks: &[ExtractedBlock]) -> Result<ExtractStats> {
    let mut stats = ExtractStats::default();

    let stored = db::list_materials(conn)?;
    if !stored.iter().any(|m| m.id == POWER) {
        db::upsert_material(conn, &Material::new(POWER.0, "Power"))?;
    }
    let mut materials: HashMap<String, MaterialId> = stored
        .into_iter()
        .map(|m| (normalize_name(&m.name), m.id))
        .collect();
    let mut next_material = materials.values().map(|id| id.0 + 1).max().unwrap_or(1);

    let existing = db::list_nodes(conn)?;
    let mut nodes: HashMap<String, (NodeId, bool)> = existing
        .iter()
        .map(|def| (normalize_name(&def.name), (def.id, def.modal_efficiency)))
        .collect();
    let mut next_node = existing
        .iter()
        .map(|def| def.id.0 + 1)
        .max()
        .unwrap_or(0)
        .max(FIRST_EXTRACTED_NODE_ID);

    for block in blocks {
        let display_name = block.display_name();
        let (id, modal) = *nodes
            .entry(normalize_name(&display_name))
            .or_insert_with(|| {
                let id = NodeId(next_node);
                next_node += 1;
                (id, false)
            });

        let mut def = NodeDef::new(id.0, display_name, block.power, block.size);
        def.modal_efficiency = modal;

        for (flows, is_input) in [(&block.inputs, true), (&block.outputs, false)] {
            for flow in flows {
                let key = normalize_name(&flow.material);
                let material = match materials.get(&key) {
                    Some(id) => *id,
                    None => {
                        let material = new_material(next_material, flow);
                        db::upsert_material(conn, &material)?;
                        info!(material = %material.name, id = next_material, "registered new material");
                        materials.insert(key, material.id);
                        next_material += 1;
                        stats.materials += 1;
                        material.id
                    }
                };

                let rates = if is_input { &mut def.inputs } else { &mut def.outputs };
                *rates.entry(material).or_default() += flow.rate;
            }
        }

        debug!(
            node = %def.name,
            id = def.id.0,
            power = def.power,
            inputs = def.inputs.len(),
            outputs = def.outputs.len(),
            "storing extracted block"
        );
        db::upsert_node(conn, &def)?;
        stats.blocks += 1;
        stats.inputs += def.inputs.len();
        stats.outputs += def.outputs.len();
    }

    let natural = db::mark_unproduced_natural(conn)?;
    debug!(materials = natural, "marked unproduced materials natural");

    Ok(stats)
}

/// Extract all block data from Java source and merge it into the database
pub fn extract_to_database(conn: &Connection, source_dir: &Path) -> Result<ExtractStats> {
    let mut stats = ExtractStats::default();

    info!(dir = %source_dir.display(), "scanning for block definitions");
    let files = find_source_files(source_dir)?;
    info!(files = files.len(), "found potential block source files");

    for filepath in &files {
        let parsed = fs::read_to_string(filepath)
            .with_context(|| format!("Failed to read {}", filepath.display()))
            .and_then(|content| parse_blocks(&content));

        match parsed {
            Ok(blocks) if blocks.is_empty() => {
                stats.skipped += 1;
            }
            Ok(blocks) => {
                info!(file = %filepath.display(), blocks = blocks.len(), "parsed");
                stats.merge(store_blocks(conn, &blocks)?);
            }
            Err(e) => {
                warn!(file = %filepath.display(), error = %e, "error parsing");
                stats.errors += 1;
            }
        }
    }

    Ok(stats)
}

#[derive(Debug, Default)]
pub struct ExtractStats {
    pub blocks: usize,
    pub inputs: usize,
    pub outputs: usize,
    pub materials: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl ExtractStats {
    fn merge(&mut self, other: ExtractStats) {
        self.blocks += other.blocks;
        self.inputs += other.inputs;
        self.outputs += other.outputs;
        self.materials += other.materials;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }
}

impl std::fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Extracted {} blocks ({} inputs, {} outputs, {} new materials). Skipped: {}, Errors: {}",
            self.blocks, self.inputs, self.outputs, self.materials, self.skipped, self.errors
        )
    }
}
