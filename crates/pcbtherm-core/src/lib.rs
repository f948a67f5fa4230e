//! Core data structures for pcbtherm.
//!
//! This crate provides:
//! - Named per-cell layers ([`LayerRegistry`], [`ThermalLayers`])
//! - The mesh data store ([`GridField`])
//! - Node numbering of active cells ([`NodeIndexer`])
//! - Materials and built-in test problems
//! - Conductance matrix assembly ([`Assembler`], [`ThermalSystem`])

pub mod assemble;
pub mod error;
pub mod grid;
pub mod indexer;
pub mod layers;
pub mod material;
pub mod problem;
pub mod system;

pub use assemble::{Assembler, AssemblyOptions, DEFAULT_SHADOW_LIMIT};
pub use error::{Error, Result};
pub use grid::{GridField, LayerStats};
pub use indexer::NodeIndexer;
pub use layers::{DoubleLayer, IntLayer, LayerKind, LayerRegistry, LayerSpec, ThermalLayers};
pub use material::{LengthUnit, Material, MaterialSet, mil_to_meters};
pub use problem::ProblemSpec;
pub use system::{
    BoundaryRecord, BoundaryStrategy, CsrMatrix, DenseShadow, Edge, LinearSystem, RowKind,
    ThermalSystem,
};
