//! The pipeline driver.
//!
//! Numbers the active cells, assembles the system once, runs every selected
//! backend against it, scatters temperatures back into the grid, checks the
//! energy balance and writes diagnostics. Only configuration and assembly
//! errors abort a run; backend failures become warnings.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use pcbtherm_core::{
    Assembler, AssemblyOptions, BoundaryStrategy, DoubleLayer, Error as CoreError, GridField,
    LayerRegistry, LayerStats, MaterialSet, NodeIndexer, ProblemSpec, ThermalLayers,
    ThermalSystem,
};
use pcbtherm_diag::{
    DiagnosticsConfig, DiagnosticsOutput, most_common_nonzero_count, write_diagnostics,
};
use pcbtherm_solver::{
    BackendKind, BackendOutput, BackendSelection, DEFAULT_ENERGY_TOLERANCE, DenseConfig,
    DenseReferenceBackend, DirectBackend, EigenBackend, EigenConfig, EnergyBalanceChecker,
    EnergyReport, IterativeBackend, IterativeConfig, Solution, SolverBackend, SpectrumReport,
};
use pcbtherm_spice::{ExternalCircuitBackend, SpiceConfig};

use crate::error::{PipelineError, PipelineWarning, Result};

/// Everything a run needs besides the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub backends: BackendSelection,
    pub assembly: AssemblyOptions,
    pub iterative: IterativeConfig,
    pub eigen: EigenConfig,
    pub dense: DenseConfig,
    pub spice: SpiceConfig,
    pub diagnostics: DiagnosticsConfig,
    /// Relative energy mismatch above which a solution is flagged.
    pub energy_tolerance: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backends: BackendSelection::default(),
            assembly: AssemblyOptions::default(),
            iterative: IterativeConfig::default(),
            eigen: EigenConfig::default(),
            dense: DenseConfig::default(),
            spice: SpiceConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            energy_tolerance: DEFAULT_ENERGY_TOLERANCE,
        }
    }
}

impl PipelineConfig {
    pub fn with_backends(mut self, backends: BackendSelection) -> Self {
        self.backends = backends;
        self
    }

    pub fn with_assembly(mut self, assembly: AssemblyOptions) -> Self {
        self.assembly = assembly;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticsConfig) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// What one backend produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeResult {
    Temperatures {
        #[serde(skip)]
        solution: Solution,
        method: String,
        converged: bool,
        iterations: Option<usize>,
        residual: Option<f64>,
        energy: EnergyReport,
        /// Largest absolute difference from the primary solution.
        max_deviation: Option<f64>,
        /// Grid layer the temperatures were written to.
        layer: Option<String>,
    },
    Spectrum {
        spectrum: SpectrumReport,
    },
    Failed {
        error: String,
    },
}

/// One backend run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendOutcome {
    pub kind: BackendKind,
    pub description: String,
    pub elapsed_secs: f64,
    pub result: OutcomeResult,
}

impl BackendOutcome {
    pub fn solution(&self) -> Option<&Solution> {
        match &self.result {
            OutcomeResult::Temperatures { solution, .. } => Some(solution),
            _ => None,
        }
    }

    pub fn energy(&self) -> Option<&EnergyReport> {
        match &self.result {
            OutcomeResult::Temperatures { energy, .. } => Some(energy),
            _ => None,
        }
    }

    pub fn spectrum(&self) -> Option<&SpectrumReport> {
        match &self.result {
            OutcomeResult::Spectrum { spectrum } => Some(spectrum),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.result, OutcomeResult::Failed { .. })
    }

    fn converged_solution(&self) -> Option<&Solution> {
        self.solution().filter(|s| s.converged)
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub node_count: usize,
    pub system_size: usize,
    pub boundary_count: usize,
    pub strategy: BoundaryStrategy,
    pub outcomes: Vec<BackendOutcome>,
    /// Backend whose temperatures went to the `deg` layer.
    pub primary: Option<BackendKind>,
    /// Summary of the `deg` layer over active cells.
    pub temperature_stats: Option<LayerStats>,
    pub diagnostics: Option<DiagnosticsOutput>,
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineReport {
    pub fn outcome(&self, kind: BackendKind) -> Option<&BackendOutcome> {
        self.outcomes.iter().find(|o| o.kind == kind)
    }

    pub fn primary_solution(&self) -> Option<&Solution> {
        self.outcome(self.primary?)?.solution()
    }

    /// Energy report of the primary solution.
    pub fn energy(&self) -> Option<&EnergyReport> {
        self.outcome(self.primary?)?.energy()
    }

    pub fn has_temperatures(&self) -> bool {
        self.primary.is_some()
    }
}

/// Grid, layers and report of a built-in problem run.
#[derive(Debug, Clone)]
pub struct ProblemRun {
    pub grid: GridField,
    pub layers: ThermalLayers,
    pub report: PipelineReport,
}

/// Runs the configured backends against a grid.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build `problem` on a grid with `registry`'s layers and run it.
    pub fn run_problem(
        &self,
        problem: &ProblemSpec,
        registry: &LayerRegistry,
        materials: &MaterialSet,
    ) -> Result<ProblemRun> {
        let layers = ThermalLayers::resolve(registry).map_err(PipelineError::Configuration)?;
        let mut grid = problem
            .build(registry, &layers, materials)
            .map_err(PipelineError::Configuration)?;
        let report = self.run(&mut grid, &layers, materials.bound_cond)?;
        Ok(ProblemRun {
            grid,
            layers,
            report,
        })
    }

    /// Solve the problem held in `grid`.
    ///
    /// The hole-flag layer is overwritten with node ids and the temperature
    /// layers receive the solutions.
    pub fn run(
        &self,
        grid: &mut GridField,
        layers: &ThermalLayers,
        bound_cond: f64,
    ) -> Result<PipelineReport> {
        if !(bound_cond > 0.0 && bound_cond.is_finite()) {
            return Err(PipelineError::Configuration(CoreError::InvalidProblem(
                format!("boundary conductance must be positive, got {bound_cond}"),
            )));
        }

        let indexer =
            NodeIndexer::build(grid, layers.holeflag).map_err(PipelineError::Configuration)?;
        log::info!(
            "Numbered {} active cells on a {}x{} mesh",
            indexer.node_count(),
            grid.width(),
            grid.height()
        );

        let system = Assembler::new(self.config.assembly.clone())
            .assemble(grid, &indexer, layers, bound_cond)
            .map_err(PipelineError::Assembly)?;

        let row_capacity = most_common_nonzero_count(&system.system.to_csr());
        log::debug!("Most common row length: {row_capacity} nonzeros");

        let mut warnings = Vec::new();
        let outcomes = self.run_backends(&system, row_capacity, &mut warnings);
        let mut report = PipelineReport {
            node_count: system.node_count(),
            system_size: system.size(),
            boundary_count: system.boundaries.len(),
            strategy: system.strategy,
            outcomes,
            primary: None,
            temperature_stats: None,
            diagnostics: None,
            warnings,
        };

        report.primary = select_primary(&report.outcomes);
        self.scatter(grid, &indexer, layers, &mut report);

        match report.primary {
            Some(kind) => log::info!("Primary temperatures from the {kind} backend"),
            None if self.config.backends.produces_temperatures() => {
                log::warn!("No backend produced a temperature field");
                report.warnings.push(PipelineWarning::NoPrimarySolution);
            }
            None => log::info!("No temperature backend selected"),
        }
        report.temperature_stats = report
            .primary
            .and_then(|_| grid.layer_stats(layers.deg, layers.holeflag));

        if self.config.diagnostics.is_enabled() {
            let x = report.primary_solution().map(|s| s.x.clone());
            match write_diagnostics(&self.config.diagnostics, &system, x.as_deref()) {
                Ok(output) => {
                    for message in &output.skipped {
                        report.warnings.push(PipelineWarning::Diagnostics {
                            message: message.clone(),
                        });
                    }
                    report.diagnostics = Some(output);
                }
                Err(e) => {
                    log::warn!("Diagnostics failed: {e}");
                    report.warnings.push(PipelineWarning::Diagnostics {
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// `row_capacity` sizes the compressed matrix of the sparse backends.
    fn backend(
        &self,
        kind: BackendKind,
        seed: Option<&Solution>,
        row_capacity: usize,
    ) -> Box<dyn SolverBackend> {
        match kind {
            BackendKind::Direct => {
                Box::new(DirectBackend::new().with_row_capacity(row_capacity))
            }
            BackendKind::DenseReference => {
                Box::new(DenseReferenceBackend::new(self.config.dense.clone()))
            }
            BackendKind::Iterative => {
                let mut config = self.config.iterative.clone();
                if let Some(method) = self.config.backends.iterative_method {
                    config = config.with_method(method);
                }
                let backend = IterativeBackend::new(config).with_row_capacity(row_capacity);
                match seed {
                    Some(s) if self.config.iterative.refine_direct => {
                        Box::new(backend.with_initial_guess(s.x.clone()))
                    }
                    _ => Box::new(backend),
                }
            }
            BackendKind::ExternalCircuit => {
                Box::new(ExternalCircuitBackend::new(self.config.spice.clone()))
            }
            BackendKind::Eigen => Box::new(EigenBackend::new(self.config.eigen.clone())),
        }
    }

    fn run_backends(
        &self,
        system: &ThermalSystem,
        row_capacity: usize,
        warnings: &mut Vec<PipelineWarning>,
    ) -> Vec<BackendOutcome> {
        let checker = EnergyBalanceChecker::new(self.config.energy_tolerance);
        let mut outcomes: Vec<BackendOutcome> = Vec::new();

        for kind in self.config.backends.enabled() {
            let seed = outcomes
                .iter()
                .find(|o| o.kind == BackendKind::Direct)
                .and_then(BackendOutcome::solution);
            let backend = self.backend(kind, seed, row_capacity);
            let description = backend.describe();
            log::info!("Running {description}");

            let start = Instant::now();
            let output = backend.solve(system);
            let elapsed_secs = start.elapsed().as_secs_f64();

            let result = match output {
                Ok(BackendOutput::Temperatures(solution)) => {
                    log::info!("{kind} finished in {elapsed_secs:.3} s");
                    temperatures_result(system, &checker, solution, warnings)
                }
                Ok(BackendOutput::Spectrum(spectrum)) => {
                    log::info!("{kind} finished in {elapsed_secs:.3} s");
                    OutcomeResult::Spectrum { spectrum }
                }
                Err(e) => {
                    log::warn!("{kind} backend failed: {e}");
                    warnings.push(PipelineWarning::BackendFailed {
                        backend: kind,
                        message: e.to_string(),
                    });
                    OutcomeResult::Failed {
                        error: e.to_string(),
                    }
                }
            };

            outcomes.push(BackendOutcome {
                kind,
                description,
                elapsed_secs,
                result,
            });
        }
        outcomes
    }

    /// Write the primary to `deg` and the others to their comparison layers.
    fn scatter(
        &self,
        grid: &mut GridField,
        indexer: &NodeIndexer,
        layers: &ThermalLayers,
        report: &mut PipelineReport,
    ) {
        let primary = report.primary;
        let primary_temps: Option<Vec<f64>> = report
            .primary_solution()
            .map(|s| s.temperatures().to_vec());

        for outcome in &mut report.outcomes {
            let kind = outcome.kind;
            let OutcomeResult::Temperatures {
                solution,
                max_deviation,
                layer,
                ..
            } = &mut outcome.result
            else {
                continue;
            };
            let temps = solution.temperatures();

            if let Some(reference) = &primary_temps {
                *max_deviation = Some(
                    temps
                        .iter()
                        .zip(reference)
                        .map(|(a, b)| (a - b).abs())
                        .fold(0.0, f64::max),
                );
            }

            let target = if Some(kind) == primary {
                Some(("deg", layers.deg))
            } else {
                comparison_layer(kind, layers)
            };
            if let Some((name, handle)) = target {
                write_layer(grid, indexer, handle, temps);
                *layer = Some(name.to_string());
                log::debug!("{kind} temperatures written to layer '{name}'");
            }
        }
    }
}

fn temperatures_result(
    system: &ThermalSystem,
    checker: &EnergyBalanceChecker,
    solution: Solution,
    warnings: &mut Vec<PipelineWarning>,
) -> OutcomeResult {
    let kind = solution.kind;
    if !solution.converged {
        warnings.push(PipelineWarning::NotConverged {
            backend: kind,
            iterations: solution.iterations,
            residual: solution.residual,
        });
    }

    let energy = match checker.check(system, solution.temperatures()) {
        Ok(report) => report,
        Err(e) => {
            // Solutions are always sized by the backend; treat a mismatch as failure.
            warnings.push(PipelineWarning::BackendFailed {
                backend: kind,
                message: e.to_string(),
            });
            return OutcomeResult::Failed {
                error: e.to_string(),
            };
        }
    };
    log::info!(
        "{kind} energy balance: injected {:.6e} W, absorbed {:.6e} W, mismatch {:.3e}",
        energy.injected,
        energy.absorbed(),
        energy.relative_mismatch
    );
    if !energy.balanced {
        log::warn!(
            "{kind} solution is out of energy balance (relative mismatch {:.3e})",
            energy.relative_mismatch
        );
        warnings.push(PipelineWarning::EnergyImbalance {
            backend: kind,
            relative_mismatch: energy.relative_mismatch,
        });
    }

    OutcomeResult::Temperatures {
        method: solution.method.clone(),
        converged: solution.converged,
        iterations: solution.iterations,
        residual: solution.residual,
        solution,
        energy,
        max_deviation: None,
        layer: None,
    }
}

/// Preference: Direct, DenseReference, converged Iterative, ExternalCircuit,
/// then a non-converged Iterative answer.
fn select_primary(outcomes: &[BackendOutcome]) -> Option<BackendKind> {
    let has = |kind: BackendKind, converged_only: bool| {
        outcomes.iter().any(|o| {
            o.kind == kind
                && if converged_only {
                    o.converged_solution().is_some()
                } else {
                    o.solution().is_some()
                }
        })
    };
    [
        (BackendKind::Direct, false),
        (BackendKind::DenseReference, false),
        (BackendKind::Iterative, true),
        (BackendKind::ExternalCircuit, false),
        (BackendKind::Iterative, false),
    ]
    .into_iter()
    .find(|&(kind, converged_only)| has(kind, converged_only))
    .map(|(kind, _)| kind)
}

fn comparison_layer(kind: BackendKind, layers: &ThermalLayers) -> Option<(&'static str, DoubleLayer)> {
    match kind {
        BackendKind::DenseReference => layers.npdeg.map(|l| ("npdeg", l)),
        BackendKind::Iterative => layers.itdeg.map(|l| ("itdeg", l)),
        BackendKind::ExternalCircuit => layers.spicedeg.map(|l| ("spicedeg", l)),
        BackendKind::Direct | BackendKind::Eigen => None,
    }
}

fn write_layer(grid: &mut GridField, indexer: &NodeIndexer, layer: DoubleLayer, temps: &[f64]) {
    for (node, x, y) in indexer.iter() {
        if let Some(&t) = temps.get(node) {
            grid.set_double(x, y, layer, t);
        }
    }
}
