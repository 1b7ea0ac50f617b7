//! Mindustry Production Calculator
//!
//! A production chain calculator for Mindustry.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mindustry_calculator::calculator::{self, ChainSummary, PlanTargets};
use mindustry_calculator::collectors;
use mindustry_calculator::{
    builtin, db, extract, Catalog, NodeId, POWER, ResolveOptions, Rounding, SourceIndex,
};

#[derive(Parser)]
#[command(name = "mindustry-calculator")]
#[command(about = "Production chain calculator for Mindustry")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "mindustry_data.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Replace the stored catalog with the built-in Serpulo catalog
    LoadBuiltin,

    /// Extract building data from Mindustry Java source
    Extract {
        /// Path to the Mindustry source directory
        source_dir: PathBuf,

        /// Clear existing data before extraction
        #[arg(long)]
        clear: bool,
    },

    /// List all buildings in the catalog
    ListNodes,

    /// List all materials in the catalog
    ListMaterials,

    /// Show details for a specific building
    Node {
        /// Building ID
        id: u32,
    },

    /// List the buildings that produce each material, preferred one marked
    Producers {
        /// Only show this material
        material: Option<String>,
    },

    /// Calculate the production chain for target buildings or materials
    Calc {
        /// Target building as ID or IDxCOUNT (e.g. "708x2")
        #[arg(short, long = "node")]
        nodes: Vec<String>,

        /// Material to produce as NAME=RATE (e.g. "Silicon=3")
        #[arg(long = "demand")]
        demands: Vec<String>,

        /// Material available for free as NAME=RATE (e.g. "Power=600")
        #[arg(long = "supply")]
        supplies: Vec<String>,

        /// Source building for a material as NAME=NODE (e.g. "Silicon=703")
        #[arg(long = "use")]
        overrides: Vec<String>,

        /// Round every attached building up to a whole unit
        #[arg(long)]
        whole_units: bool,

        /// Round only these buildings up to whole units
        #[arg(long = "round", conflicts_with = "whole_units")]
        round: Vec<u32>,

        /// Give up after attaching this many sources
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Never give up on a production cycle
        #[arg(long, conflicts_with = "max_iterations")]
        unbounded: bool,

        /// Show every building in the chain and the net flow
        #[arg(short, long)]
        verbose: bool,

        /// Report the ore and liquid tiles needed for the raw inputs
        #[arg(long)]
        tiles: bool,

        /// Assume drills are boosted with water
        #[arg(long, requires = "tiles")]
        boosted: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut conn = Connection::open(&cli.database)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadBuiltin => {
            let catalog = builtin::catalog()?;
            db::store_catalog(&mut conn, &catalog)?;
            println!(
                "Loaded {} materials and {} buildings.",
                catalog.materials().len(),
                catalog.nodes().len()
            );
        }

        Commands::Extract { source_dir, clear } => {
            if clear {
                println!("Clearing existing data...");
                db::clear_catalog(&conn)?;
            }

            let stats = extract::extract_to_database(&conn, &source_dir)?;
            println!("\n{}", stats);
        }

        Commands::ListNodes => {
            let catalog = open_catalog(&conn)?;
            println!("{:>5}  {:<28} {:>4} {:>10}", "ID", "Building", "Size", "Power/s");
            println!("{}", "-".repeat(51));
            for node in catalog.nodes() {
                println!(
                    "{:>5}  {:<28} {:>4} {:>10.1}",
                    node.id().0,
                    node.name(),
                    node.size(),
                    node.power()
                );
            }
        }

        Commands::ListMaterials => {
            let catalog = open_catalog(&conn)?;
            println!("{:>4}  {:<16} {:>8}  Kind", "ID", "Material", "Hardness");
            println!("{}", "-".repeat(44));
            for material in catalog.materials() {
                let hardness = material
                    .hardness
                    .map_or_else(|| "-".to_string(), |h| h.to_string());
                let kind = match (material.is_natural, material.is_liquid) {
                    (true, true) => "natural liquid",
                    (true, false) => "natural",
                    (false, true) => "liquid",
                    (false, false) => "",
                };
                println!(
                    "{:>4}  {:<16} {:>8}  {}",
                    material.id.0, material.name, hardness, kind
                );
            }
        }

        Commands::Node { id } => {
            let catalog = open_catalog(&conn)?;
            let Some(node) = catalog.node(NodeId(id)) else {
                bail!("Building {} not found", id);
            };

            println!("Building: {}", node.name());
            println!("  ID: {}", node.id().0);
            println!("  Size: {}x{}", node.size(), node.size());
            println!("  Power: {}/s", node.power());
            if node.definition().modal_efficiency {
                println!("  Efficiency depends on placement");
            }
            if !node.inputs().is_empty() {
                println!("  Inputs:");
                for (material, rate) in node.inputs() {
                    println!("    {} @ {:.3}/s", catalog.material_name(*material), rate);
                }
            }
            if !node.outputs().is_empty() {
                println!("  Outputs:");
                for (material, rate) in node.outputs() {
                    println!("    {} @ {:.3}/s", catalog.material_name(*material), rate);
                }
            }
        }

        Commands::Producers { material } => {
            let catalog = open_catalog(&conn)?;
            let index = SourceIndex::build(&catalog);

            let mut names = match material {
                Some(name) => vec![name],
                None => db::list_producible_materials(&conn)?,
            };
            if names.is_empty() {
                names = catalog
                    .materials()
                    .iter()
                    .filter(|m| !index.sources(m.id).is_empty())
                    .map(|m| m.name.clone())
                    .collect();
            }

            for name in &names {
                let Some(material) = catalog.material_by_name(name) else {
                    bail!("Unknown material '{}'", name);
                };
                let preferred = index.preferred(material.id).map(|node| node.id());
                println!("{}:", material.name);
                if index.sources(material.id).is_empty() {
                    println!("  (no producers)");
                }
                for node in index.sources(material.id) {
                    let marker = if Some(node.id()) == preferred { "*" } else { " " };
                    let rate = if material.id == POWER {
                        node.power()
                    } else {
                        node.outputs().get(&material.id).copied().unwrap_or(0.0)
                    };
                    println!(
                        "  {} {:>5}  {:<28} {:>8.3}/s",
                        marker,
                        node.id().0,
                        node.name(),
                        rate
                    );
                }
            }
        }

        Commands::Calc {
            nodes,
            demands,
            supplies,
            overrides,
            whole_units,
            round,
            max_iterations,
            unbounded,
            verbose,
            tiles,
            boosted,
        } => {
            let catalog = open_catalog(&conn)?;
            let index = SourceIndex::build(&catalog);

            let mut targets = PlanTargets::default();
            for term in &nodes {
                targets.nodes.push(calculator::parse_node_term(term)?);
            }
            for term in &demands {
                let (material, rate) = calculator::parse_rate_term(&catalog, term)?;
                targets.materials.push((material, -rate));
            }
            for term in &supplies {
                targets
                    .materials
                    .push(calculator::parse_rate_term(&catalog, term)?);
            }
            if targets.nodes.is_empty() && targets.materials.is_empty() {
                bail!("Nothing to calculate. Give at least one --node or --demand.");
            }

            let mut options = ResolveOptions::default();
            for term in &overrides {
                let (material, node) = calculator::parse_override_term(&catalog, term)?;
                options = options.with_override(material, node);
            }
            if whole_units {
                options = options.with_rounding(Rounding::WholeUnits);
            } else if !round.is_empty() {
                let ids: BTreeSet<NodeId> = round.into_iter().map(NodeId).collect();
                options = options.with_rounding(Rounding::PerNode(ids));
            }
            if unbounded {
                options = options.with_max_iterations(None);
            } else if let Some(cap) = max_iterations {
                options = options.with_max_iterations(Some(cap));
            }

            let group =
                calculator::calculate_production_chain(&catalog, &index, &targets, &options)?;

            if verbose {
                println!("Production chain:\n");
                println!("{}", calculator::format_flow_group(&group, &catalog));
            }

            let summary = ChainSummary::new(&group, &catalog);
            println!("{}", summary);

            if tiles {
                let report =
                    collectors::tile_requirements(&catalog, &group.net_inputs(), boosted);
                println!("\nCollectors:");
                if report.is_empty() {
                    println!("  (nothing to mine or pump)");
                }
                for requirement in &report {
                    println!("  {}", requirement);
                }
            }
        }
    }

    Ok(())
}

/// The stored catalog, or the built-in one if nothing has been stored yet
fn open_catalog(conn: &Connection) -> Result<Catalog> {
    let catalog = db::load_catalog(conn)?;
    if catalog.nodes().is_empty() {
        info!("database holds no buildings, using the built-in catalog");
        return Ok(builtin::catalog()?);
    }
    Ok(catalog)
}
