//! Errors raised by the production-graph engine

use thiserror::Error;

use crate::models::{MaterialId, NodeId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A node was built at an efficiency it has no mode for
    #[error("{node} has no options for efficiency (must be 1.0, got {efficiency})")]
    Configuration { node: String, efficiency: f64 },

    /// The left operand demands none of the right operand's outputs
    #[error("no shared material: the left operand demands none of the right operand's outputs")]
    UnsatisfiableDemand,

    #[error("no recorded source produces material {material}")]
    NoSourceFound { material: MaterialId },

    #[error("upstream resolution did not converge after {iterations} iterations")]
    ResolutionDidNotConverge { iterations: usize },

    #[error("node {node} references unregistered material {material}")]
    UnknownMaterial { node: NodeId, material: MaterialId },

    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: u32 },

    #[error("{material} cannot be mined (no hardness)")]
    NotMinable { material: String },

    #[error("{material} (hardness {hardness}) is too hard for {drill}")]
    TooHard {
        material: String,
        hardness: u8,
        drill: String,
    },

    #[error("{material} cannot be pumped")]
    NotPumpable { material: String },
}
