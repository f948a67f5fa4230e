//! Backend selection.
//!
//! Decides which backends run against an assembled system, and in which
//! order.

use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::error::{Error, Result};
use crate::iterative::IterativeMethod;

/// Which backends a run uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSelection {
    pub direct: bool,
    pub dense_reference: bool,
    pub iterative: bool,
    pub external_circuit: bool,
    pub eigen: bool,
    /// Krylov method named in the list (`cg` or `gmres`), overriding the
    /// iterative configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterative_method: Option<IterativeMethod>,
}

impl Default for BackendSelection {
    fn default() -> Self {
        Self::only(BackendKind::Direct)
    }
}

impl BackendSelection {
    /// No backend enabled.
    pub fn none() -> Self {
        Self {
            direct: false,
            dense_reference: false,
            iterative: false,
            external_circuit: false,
            eigen: false,
            iterative_method: None,
        }
    }

    /// A single backend.
    pub fn only(kind: BackendKind) -> Self {
        Self::none().with(kind, true)
    }

    /// Parse a comma-separated list such as `"direct,cg,eigen"`.
    ///
    /// `cg` and `gmres` enable the iterative backend and pin its method; the
    /// last one named wins.
    pub fn from_names(list: &str) -> Result<Self> {
        let mut selection = Self::none();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let kind =
                BackendKind::from_name(name).ok_or_else(|| Error::UnknownBackend(name.to_string()))?;
            selection = selection.with(kind, true);
            if kind == BackendKind::Iterative {
                if let Some(method) = IterativeMethod::from_name(name) {
                    selection.iterative_method = Some(method);
                }
            }
        }
        Ok(selection)
    }

    pub fn with_iterative_method(mut self, method: IterativeMethod) -> Self {
        self.iterative = true;
        self.iterative_method = Some(method);
        self
    }

    /// Enable or disable one backend.
    pub fn with(mut self, kind: BackendKind, enabled: bool) -> Self {
        match kind {
            BackendKind::Direct => self.direct = enabled,
            BackendKind::DenseReference => self.dense_reference = enabled,
            BackendKind::Iterative => self.iterative = enabled,
            BackendKind::ExternalCircuit => self.external_circuit = enabled,
            BackendKind::Eigen => self.eigen = enabled,
        }
        self
    }

    pub fn is_enabled(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Direct => self.direct,
            BackendKind::DenseReference => self.dense_reference,
            BackendKind::Iterative => self.iterative,
            BackendKind::ExternalCircuit => self.external_circuit,
            BackendKind::Eigen => self.eigen,
        }
    }

    /// Enabled backends in execution order.
    pub fn enabled(&self) -> Vec<BackendKind> {
        BackendKind::ALL
            .into_iter()
            .filter(|&k| self.is_enabled(k))
            .collect()
    }

    /// Whether any enabled backend produces temperatures.
    pub fn produces_temperatures(&self) -> bool {
        self.enabled().iter().any(|&k| k != BackendKind::Eigen)
    }

    /// Comma-separated names of the enabled backends.
    pub fn describe(&self) -> String {
        let names: Vec<&str> = self.enabled().iter().map(|k| k.name()).collect();
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join(", ")
        }
    }
}
