//! The external circuit backend.

use std::path::Path;

use pcbtherm_core::ThermalSystem;
use pcbtherm_solver::{BackendKind, BackendOutput, Solution, SolverBackend};

use crate::config::SpiceConfig;
use crate::error::{Result, SpiceError};
use crate::netlist::Netlist;
use crate::raw::RawData;
use crate::runner::run_simulator;

/// Solves the network by handing an equivalent netlist to an external
/// circuit simulator and reading node voltages back as temperatures.
#[derive(Debug, Clone, Default)]
pub struct ExternalCircuitBackend {
    config: SpiceConfig,
}

impl ExternalCircuitBackend {
    pub fn new(config: SpiceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpiceConfig {
        &self.config
    }

    /// Write the netlist, run the simulator and parse its output.
    pub fn simulate(&self, system: &ThermalSystem) -> Result<Vec<f64>> {
        self.config.validate()?;

        let scratch;
        let dir: &Path = match &self.config.work_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| SpiceError::io(dir, e))?;
                dir
            }
            None => {
                scratch = tempfile::Builder::new()
                    .prefix("pcbtherm-spice")
                    .keep(self.config.keep_files)
                    .tempdir()
                    .map_err(|e| SpiceError::io(std::env::temp_dir(), e))?;
                scratch.path()
            }
        };

        let files = self.config.files_in(dir);
        let netlist = Netlist::emit(system, &self.config);
        std::fs::write(&files.netlist, netlist.text())
            .map_err(|e| SpiceError::io(&files.netlist, e))?;

        run_simulator(&self.config, &files, dir)?;

        let text = std::fs::read_to_string(&files.raw).map_err(|e| SpiceError::io(&files.raw, e))?;
        let raw = RawData::parse(&text)?;
        let temps = raw.temperatures(&netlist)?;

        if self.config.work_dir.is_some() && !self.config.keep_files {
            for path in [&files.netlist, &files.raw, &files.log] {
                remove_quietly(path);
            }
        } else if self.config.keep_files {
            log::info!("Simulator files kept in {}", dir.display());
        }
        Ok(temps)
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::debug!("could not remove {}: {e}", path.display());
        }
    }
}

impl SolverBackend for ExternalCircuitBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ExternalCircuit
    }

    fn describe(&self) -> String {
        format!("external circuit ({})", self.config.program)
    }

    fn solve(&self, system: &ThermalSystem) -> pcbtherm_solver::Result<BackendOutput> {
        let temps = self.simulate(system)?;
        let n = temps.len();
        Ok(BackendOutput::Temperatures(Solution::exact(
            BackendKind::ExternalCircuit,
            self.config.program.clone(),
            temps,
            n,
        )))
    }
}
