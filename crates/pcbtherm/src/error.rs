//! Error and warning types for the pipeline.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use pcbtherm_solver::BackendKind;

/// Fatal pipeline errors. Anything that happens after assembly is a
/// [`PipelineWarning`] instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid mesh, layer table or problem definition.
    #[error("configuration error: {0}")]
    Configuration(#[source] pcbtherm_core::Error),

    /// The system could not be assembled.
    #[error("assembly failed: {0}")]
    Assembly(#[source] pcbtherm_core::Error),
}

/// Result type for pipeline runs.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Advisory conditions collected during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// A backend failed; the others still ran.
    BackendFailed { backend: BackendKind, message: String },
    /// An iterative solve returned a best-effort answer.
    NotConverged {
        backend: BackendKind,
        iterations: Option<usize>,
        residual: Option<f64>,
    },
    /// Injected and absorbed power disagree beyond tolerance.
    EnergyImbalance {
        backend: BackendKind,
        relative_mismatch: f64,
    },
    /// No selected backend produced temperatures.
    NoPrimarySolution,
    /// A diagnostic artifact was not written.
    Diagnostics { message: String },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::BackendFailed { backend, message } => {
                write!(f, "{backend} backend failed: {message}")
            }
            PipelineWarning::NotConverged {
                backend,
                iterations,
                residual,
            } => {
                write!(f, "{backend} backend did not converge")?;
                if let Some(it) = iterations {
                    write!(f, " after {it} iterations")?;
                }
                if let Some(r) = residual {
                    write!(f, " (residual {r:.3e})")?;
                }
                Ok(())
            }
            PipelineWarning::EnergyImbalance {
                backend,
                relative_mismatch,
            } => write!(
                f,
                "{backend} solution is out of energy balance (relative mismatch {relative_mismatch:.3e})"
            ),
            PipelineWarning::NoPrimarySolution => {
                write!(f, "no backend produced a temperature field")
            }
            PipelineWarning::Diagnostics { message } => write!(f, "diagnostics: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_messages() {
        let w = PipelineWarning::NotConverged {
            backend: BackendKind::Iterative,
            iterations: Some(400),
            residual: Some(1.5e-3),
        };
        assert_eq!(
            w.to_string(),
            "iterative backend did not converge after 400 iterations (residual 1.500e-3)"
        );
        let w = PipelineWarning::BackendFailed {
            backend: BackendKind::ExternalCircuit,
            message: "backend unavailable: simulator timed out after 600 s".into(),
        };
        assert!(w.to_string().starts_with("external_circuit backend failed"));
    }

    #[test]
    fn warnings_serialize_with_kind_tag() {
        let json = serde_json::to_value(PipelineWarning::EnergyImbalance {
            backend: BackendKind::Direct,
            relative_mismatch: 0.5,
        })
        .unwrap();
        assert_eq!(json["kind"], "energy_imbalance");
        assert_eq!(json["backend"], "direct");
    }
}
