//! Error types for solver backends.

use thiserror::Error;

/// Errors that can occur while running a solver backend.
///
/// These are backend-local: the pipeline records them per backend and keeps
/// going with the others.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The matrix could not be factored or produced a non-finite solution.
    #[error("singular matrix")]
    SingularMatrix,

    /// An iterative method ran out of iterations.
    #[error("no convergence after {iterations} iterations (residual {residual:.3e})")]
    NonConvergence { iterations: usize, residual: f64 },

    /// The backend cannot run in this environment or on this system.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A backend name in a selection list is not recognized.
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    /// Vector or matrix dimensions disagree.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Error from the core crate.
    #[error(transparent)]
    Core(#[from] pcbtherm_core::Error),
}

/// Result type for solver operations.
pub type Result<T> = std::result::Result<T, Error>;
