//! Dense reference backend.

use serde::{Deserialize, Serialize};

use pcbtherm_core::ThermalSystem;

use crate::backend::{BackendKind, BackendOutput, Solution, SolverBackend};
use crate::error::{Error, Result};
use crate::linear::solve_dense;

/// Configuration of the dense reference backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenseConfig {
    /// Largest system the dense path will materialize.
    pub max_size: usize,
}

impl Default for DenseConfig {
    fn default() -> Self {
        Self { max_size: 2000 }
    }
}

/// Full-matrix LU through nalgebra, used as a correctness oracle for small
/// meshes.
#[derive(Debug, Clone, Default)]
pub struct DenseReferenceBackend {
    config: DenseConfig,
}

impl DenseReferenceBackend {
    pub fn new(config: DenseConfig) -> Self {
        Self { config }
    }
}

impl SolverBackend for DenseReferenceBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DenseReference
    }

    fn describe(&self) -> String {
        format!("dense reference (nalgebra LU, max size {})", self.config.max_size)
    }

    fn solve(&self, system: &ThermalSystem) -> Result<BackendOutput> {
        let size = system.size();
        if size > self.config.max_size {
            return Err(Error::BackendUnavailable(format!(
                "system size {} exceeds dense limit {}",
                size, self.config.max_size
            )));
        }

        // Reuse the shadow captured during assembly when there is one.
        let a = match &system.shadow {
            Some(shadow) => shadow.matrix().clone(),
            None => system.system.to_dense_matrix(),
        };
        let x = solve_dense(a, &system.system.rhs)?;
        Ok(BackendOutput::Temperatures(Solution::exact(
            BackendKind::DenseReference,
            "nalgebra dense LU",
            x,
            system.node_count(),
        )))
    }
}
