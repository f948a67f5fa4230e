//! Post-solve energy conservation check.
//!
//! In steady state every watt injected by heat sources leaves through the
//! boundary conductances (and the diagonal damping shunt, when present):
//!
//! ```text
//! sum(heat) == sum over boundary nodes of (x[n] - T[n]) * G_b  +  damping * sum(x)
//! ```

use serde::Serialize;

use pcbtherm_core::ThermalSystem;

use crate::error::{Error, Result};

/// Default relative mismatch above which a solve is flagged.
pub const DEFAULT_ENERGY_TOLERANCE: f64 = 1e-3;

/// Injected versus absorbed power for one solution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyReport {
    /// Total power of the heat sources.
    pub injected: f64,
    /// Power flowing into the boundary reservoirs.
    pub boundary_power: f64,
    /// Power lost through the damping shunt.
    pub damping_power: f64,
    /// `|injected - absorbed| / max(|injected|, |absorbed|)`; zero when both
    /// sides vanish.
    pub relative_mismatch: f64,
    /// Whether the mismatch is within tolerance.
    pub balanced: bool,
}

impl EnergyReport {
    /// Boundary plus damping power.
    pub fn absorbed(&self) -> f64 {
        self.boundary_power + self.damping_power
    }
}

/// Compares injected heat with power absorbed at the boundaries.
#[derive(Debug, Clone, Copy)]
pub struct EnergyBalanceChecker {
    tolerance: f64,
}

impl Default for EnergyBalanceChecker {
    fn default() -> Self {
        Self::new(DEFAULT_ENERGY_TOLERANCE)
    }
}

impl EnergyBalanceChecker {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Check `temperatures` (one value per node) against `system`.
    pub fn check(&self, system: &ThermalSystem, temperatures: &[f64]) -> Result<EnergyReport> {
        let n = system.node_count();
        if temperatures.len() < n {
            return Err(Error::DimensionMismatch {
                expected: n,
                actual: temperatures.len(),
            });
        }

        let injected: f64 = system.heat.iter().sum();
        let boundary_power: f64 = system
            .boundaries
            .iter()
            .map(|b| (temperatures[b.node] - b.temperature) * b.conductance)
            .sum();
        let damping_power = system.damping * temperatures[..n].iter().sum::<f64>();
        let absorbed = boundary_power + damping_power;

        // Unheated boards leave only roundoff in the boundary terms.
        let roundoff: f64 = 1e-9
            * system
                .boundaries
                .iter()
                .map(|b| b.conductance * b.temperature.abs())
                .sum::<f64>();
        let scale = injected.abs().max(absorbed.abs());
        let relative_mismatch = if scale <= roundoff.max(1e-30) {
            0.0
        } else {
            (injected - absorbed).abs() / scale
        };
        let report = EnergyReport {
            injected,
            boundary_power,
            damping_power,
            relative_mismatch,
            balanced: relative_mismatch <= self.tolerance,
        };

        log::debug!(
            "Energy balance: injected {:.6e} W, boundary {:.6e} W, damping {:.3e} W, mismatch {:.3e}",
            report.injected,
            report.boundary_power,
            report.damping_power,
            report.relative_mismatch
        );
        Ok(report)
    }
}
