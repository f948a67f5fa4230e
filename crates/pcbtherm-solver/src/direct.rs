//! Sparse direct backend.

use pcbtherm_core::ThermalSystem;

use crate::backend::{BackendKind, BackendOutput, Solution, SolverBackend};
use crate::error::Result;
use crate::linear::{DEFAULT_ROW_CAPACITY, solve_sparse};

/// Sparse LU factorization through faer. Deterministic; the preferred
/// source of the primary temperature field.
#[derive(Debug, Clone, Copy)]
pub struct DirectBackend {
    row_capacity: usize,
}

impl Default for DirectBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectBackend {
    pub fn new() -> Self {
        Self {
            row_capacity: DEFAULT_ROW_CAPACITY,
        }
    }

    /// Entries per row to reserve while compressing the matrix.
    pub fn with_row_capacity(mut self, row_capacity: usize) -> Self {
        self.row_capacity = row_capacity;
        self
    }
}

impl SolverBackend for DirectBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Direct
    }

    fn describe(&self) -> String {
        "direct (faer sparse LU)".to_string()
    }

    fn solve(&self, system: &ThermalSystem) -> Result<BackendOutput> {
        let x = solve_sparse(&system.system, self.row_capacity)?;
        Ok(BackendOutput::Temperatures(Solution::exact(
            BackendKind::Direct,
            "faer sparse LU",
            x,
            system.node_count(),
        )))
    }
}
