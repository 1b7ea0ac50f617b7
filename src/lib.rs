//! Mindustry Production Calculator
//!
//! Models buildings as per-second material flows, combines them with a small
//! algebra (`FlowGroup`), and resolves the upstream buildings needed to feed
//! a production target.

pub mod builtin;
pub mod calculator;
pub mod catalog;
pub mod collectors;
pub mod db;
pub mod error;
pub mod extract;
pub mod flow;
pub mod models;
pub mod resolver;
pub mod sources;

pub use catalog::Catalog;
pub use error::{Error, Result};
pub use flow::{EPSILON, FlowGroup, Operand};
pub use models::{Material, MaterialId, NodeDef, NodeId, POWER, ProductionNode, RateMap};
pub use resolver::{ResolveOptions, Resolver, Rounding};
pub use sources::SourceIndex;
