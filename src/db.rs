//! Database schema and operations for the stored building catalog

use std::collections::HashMap;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::catalog::Catalog;
use crate::models::{Material, MaterialId, NodeDef, NodeId, POWER, ProductionNode, RateMap};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Materials, including Power
        CREATE TABLE IF NOT EXISTS materials (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            hardness INTEGER,
            is_liquid INTEGER NOT NULL DEFAULT 0,
            is_natural INTEGER NOT NULL DEFAULT 0
        );

        -- Building definitions; seq keeps catalog declaration order
        CREATE TABLE IF NOT EXISTS nodes (
            id INTEGER PRIMARY KEY,
            seq INTEGER NOT NULL,
            name TEXT NOT NULL,
            power REAL NOT NULL,
            size INTEGER NOT NULL,
            modal_efficiency INTEGER NOT NULL DEFAULT 0
        );

        -- Production inputs (what a building consumes)
        CREATE TABLE IF NOT EXISTS node_inputs (
            node_id INTEGER NOT NULL,
            material_id INTEGER NOT NULL,
            rate REAL NOT NULL,
            PRIMARY KEY (node_id, material_id)
        );

        -- Production outputs (what a building produces)
        CREATE TABLE IF NOT EXISTS node_outputs (
            node_id INTEGER NOT NULL,
            material_id INTEGER NOT NULL,
            rate REAL NOT NULL,
            PRIMARY KEY (node_id, material_id)
        );

        CREATE INDEX IF NOT EXISTS idx_node_outputs_material ON node_outputs(material_id);
        "#,
    )?;
    Ok(())
}

/// Clear the stored catalog
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM node_outputs;
        DELETE FROM node_inputs;
        DELETE FROM nodes;
        DELETE FROM materials;
        "#,
    )?;
    Ok(())
}

/// Insert or replace a material
pub fn upsert_material(conn: &Connection, material: &Material) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO materials (id, name, hardness, is_liquid, is_natural)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            material.id.0,
            &material.name,
            material.hardness,
            material.is_liquid,
            material.is_natural,
        ),
    )?;
    Ok(())
}

/// Insert or replace a building and its rates. A building that already
/// exists keeps its place in the catalog order.
pub fn upsert_node(conn: &Connection, def: &NodeDef) -> Result<()> {
    let existing: Option<i64> = conn
        .query_row("SELECT seq FROM nodes WHERE id = ?1", [def.id.0], |row| {
            row.get(0)
        })
        .optional()?;
    let seq = match existing {
        Some(seq) => seq,
        None => conn.query_row("SELECT COALESCE(MAX(seq), -1) + 1 FROM nodes", [], |row| {
            row.get(0)
        })?,
    };

    conn.execute(
        "INSERT OR REPLACE INTO nodes (id, seq, name, power, size, modal_efficiency)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            def.id.0,
            seq,
            &def.name,
            def.power,
            def.size,
            def.modal_efficiency,
        ),
    )?;

    conn.execute("DELETE FROM node_inputs WHERE node_id = ?1", [def.id.0])?;
    conn.execute("DELETE FROM node_outputs WHERE node_id = ?1", [def.id.0])?;
    for (material, rate) in &def.inputs {
        conn.execute(
            "INSERT INTO node_inputs (node_id, material_id, rate) VALUES (?1, ?2, ?3)",
            (def.id.0, material.0, rate),
        )?;
    }
    for (material, rate) in &def.outputs {
        conn.execute(
            "INSERT INTO node_outputs (node_id, material_id, rate) VALUES (?1, ?2, ?3)",
            (def.id.0, material.0, rate),
        )?;
    }
    Ok(())
}

/// Flag every material no stored building outputs as natural. Power is
/// left alone since generators supply it. Returns the number of rows changed.
pub fn mark_unproduced_natural(conn: &Connection) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE materials SET is_natural = 1
         WHERE id != ?1
           AND is_natural = 0
           AND id NOT IN (SELECT material_id FROM node_outputs)",
        [POWER.0],
    )?;
    Ok(changed)
}

/// Store a whole catalog, replacing whatever was there
pub fn store_catalog(conn: &mut Connection, catalog: &Catalog) -> Result<()> {
    let tx = conn.transaction()?;
    clear_catalog(&tx)?;
    for material in catalog.materials() {
        upsert_material(&tx, material)?;
    }
    for node in catalog.nodes() {
        upsert_node(&tx, node.definition())?;
    }
    tx.commit()?;
    Ok(())
}

/// List all materials in id order
pub fn list_materials(conn: &Connection) -> Result<Vec<Material>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, hardness, is_liquid, is_natural FROM materials ORDER BY id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(Material {
            id: MaterialId(row.get(0)?),
            name: row.get(1)?,
            hardness: row.get(2)?,
            is_liquid: row.get(3)?,
            is_natural: row.get(4)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn load_rates(conn: &Connection, table: &str) -> Result<HashMap<u32, RateMap>> {
    let mut stmt = conn.prepare(&format!("SELECT node_id, material_id, rate FROM {table}"))?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            MaterialId(row.get(1)?),
            row.get::<_, f64>(2)?,
        ))
    })?;

    let mut rates: HashMap<u32, RateMap> = HashMap::new();
    for row in rows {
        let (node, material, rate) = row?;
        rates.entry(node).or_default().insert(material, rate);
    }
    Ok(rates)
}

/// List all building definitions in catalog order
pub fn list_nodes(conn: &Connection) -> Result<Vec<NodeDef>> {
    let mut inputs = load_rates(conn, "node_inputs")?;
    let mut outputs = load_rates(conn, "node_outputs")?;

    let mut stmt =
        conn.prepare("SELECT id, name, power, size, modal_efficiency FROM nodes ORDER BY seq")?;
    let rows = stmt.query_map([], |row| {
        Ok(NodeDef {
            id: NodeId(row.get(0)?),
            name: row.get(1)?,
            power: row.get(2)?,
            size: row.get(3)?,
            inputs: RateMap::new(),
            outputs: RateMap::new(),
            modal_efficiency: row.get(4)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        let mut def = row?;
        def.inputs = inputs.remove(&def.id.0).unwrap_or_default();
        def.outputs = outputs.remove(&def.id.0).unwrap_or_default();
        results.push(def);
    }
    Ok(results)
}

/// Load the stored catalog, validated
pub fn load_catalog(conn: &Connection) -> Result<Catalog> {
    let materials = list_materials(conn)?;
    let nodes = list_nodes(conn)?
        .into_iter()
        .map(NodeDef::build)
        .collect::<crate::Result<Vec<ProductionNode>>>()?;
    let catalog = Catalog::new(materials, nodes).context("Stored catalog is inconsistent")?;
    Ok(catalog)
}

/// List the names of all materials some building outputs
pub fn list_producible_materials(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT m.name
         FROM node_outputs o
         JOIN materials m ON m.id = o.material_id
         ORDER BY m.name",
    )?;

    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}
