//! Error types for mesh construction and matrix assembly.
//!
//! Every variant here is a configuration error: it is raised before a
//! linear system exists and aborts the run.

use thiserror::Error;

use crate::layers::LayerKind;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while describing a problem or assembling its system.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Mesh dimensions must both be at least one cell.
    #[error("invalid mesh size {width}x{height}: both dimensions must be at least 1")]
    InvalidMeshSize { width: usize, height: usize },

    /// A layer name required by the caller is not registered.
    #[error("missing {kind} layer '{name}'")]
    MissingLayer { name: String, kind: LayerKind },

    /// A layer name was registered twice.
    #[error("layer '{name}' is already registered")]
    DuplicateLayer { name: String },

    /// A layer exists but lives in the other array.
    #[error("layer '{name}' is a {actual} layer, expected {expected}")]
    LayerKindMismatch {
        name: String,
        expected: LayerKind,
        actual: LayerKind,
    },

    /// Layer specs do not describe a dense set of slots.
    #[error("invalid layer table: {0}")]
    InvalidLayerTable(String),

    /// A cell coordinate lies outside the mesh.
    #[error("cell ({x}, {y}) is outside the {width}x{height} mesh")]
    CoordinateOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    /// A node id lies outside `[0, node_count)`.
    #[error("node {node} is out of range (node count {count})")]
    NodeOutOfRange { node: usize, count: usize },

    /// A built-in problem cannot be laid out on the requested mesh.
    #[error("invalid problem: {0}")]
    InvalidProblem(String),

    /// A vector does not match the system size.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
