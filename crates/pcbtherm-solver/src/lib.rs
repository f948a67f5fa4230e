//! Solver backends for pcbtherm.
//!
//! This crate provides:
//! - The [`SolverBackend`] trait and its output types
//! - Direct sparse LU ([`DirectBackend`]) and dense LU ([`DenseReferenceBackend`])
//! - Jacobi-preconditioned CG and restarted GMRES ([`IterativeBackend`])
//! - Extreme eigenvalues and condition number ([`EigenBackend`])
//! - Post-solve energy conservation check ([`EnergyBalanceChecker`])

pub mod backend;
pub mod dense;
pub mod direct;
pub mod dispatch;
pub mod eigen;
pub mod energy;
pub mod error;
pub mod iterative;
pub mod linear;
pub mod operator;
pub mod preconditioner;
pub mod sparse_operator;

pub use backend::{BackendKind, BackendOutput, Solution, SolverBackend, SpectrumReport};
pub use dense::{DenseConfig, DenseReferenceBackend};
pub use direct::DirectBackend;
pub use dispatch::BackendSelection;
pub use eigen::{EigenBackend, EigenConfig};
pub use energy::{DEFAULT_ENERGY_TOLERANCE, EnergyBalanceChecker, EnergyReport};
pub use error::{Error, Result};
pub use iterative::{IterativeBackend, IterativeConfig, IterativeMethod, KrylovConfig, KrylovResult};
pub use operator::RealOperator;
pub use preconditioner::{IdentityPreconditioner, JacobiPreconditioner, RealPreconditioner};
pub use sparse_operator::SparseRealOperator;
