//! Steady-state 2D PCB heat conduction.
//!
//! A board is a rectangular mesh of cells carrying named per-cell layers.
//! Heat injected into cells flows through the resistance network to
//! fixed-temperature boundary cells. The pipeline numbers the active cells,
//! assembles the conductance system once and hands it to every selected
//! solver backend.
//!
//! # Example
//!
//! ```no_run
//! use pcbtherm::{LayerRegistry, MaterialSet, Pipeline, PipelineConfig, ProblemSpec};
//!
//! let registry = LayerRegistry::standard();
//! let run = Pipeline::new(PipelineConfig::default())
//!     .run_problem(&ProblemSpec::Tiny, &registry, &MaterialSet::default())
//!     .expect("tiny problem solves");
//! println!("{:?}", run.report.temperature_stats);
//! ```
//!
//! The building blocks live in the sub-crates, re-exported here:
//! [`core`], [`solver`], [`spice`] and [`diag`].

pub mod error;
pub mod pipeline;

pub use pcbtherm_core as core;
pub use pcbtherm_diag as diag;
pub use pcbtherm_solver as solver;
pub use pcbtherm_spice as spice;

pub use error::{PipelineError, PipelineWarning, Result};
pub use pipeline::{
    BackendOutcome, OutcomeResult, Pipeline, PipelineConfig, PipelineReport, ProblemRun,
};

pub use pcbtherm_core::{
    AssemblyOptions, BoundaryStrategy, GridField, LayerKind, LayerRegistry, LayerSpec,
    LayerStats, MaterialSet, ProblemSpec, ThermalLayers,
};
pub use pcbtherm_diag::DiagnosticsConfig;
pub use pcbtherm_solver::{
    BackendKind, BackendSelection, DenseConfig, EigenConfig, EnergyReport, IterativeConfig,
    IterativeMethod, Solution,
};
pub use pcbtherm_spice::SpiceConfig;
