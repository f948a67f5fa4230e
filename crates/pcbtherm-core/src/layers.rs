//! Named per-cell data layers.
//!
//! A mesh stores two dense arrays, one of `f64` and one of `i32`, each with a
//! fixed number of layers. The [`LayerRegistry`] maps symbolic names onto
//! slots in those arrays, and [`ThermalLayers`] resolves the names the solver
//! pipeline needs into typed handles once, up front.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which per-cell array a layer lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Floating-point layer (resistance, heat, temperatures).
    Double,
    /// Integer layer (flags, node ids).
    Int,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Double => write!(f, "double"),
            LayerKind::Int => write!(f, "int"),
        }
    }
}

/// Handle to a slot in the floating-point array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DoubleLayer(pub(crate) usize);

impl DoubleLayer {
    /// Slot index within the floating-point array.
    pub fn slot(self) -> usize {
        self.0
    }
}

/// Handle to a slot in the integer array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntLayer(pub(crate) usize);

impl IntLayer {
    /// Slot index within the integer array.
    pub fn slot(self) -> usize {
        self.0
    }
}

/// One entry of a layer table, in the `{index, type, name}` form used by run
/// configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LayerSlot {
    kind: LayerKind,
    slot: usize,
}

/// Ordered mapping from layer name to array slot.
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    entries: IndexMap<String, LayerSlot>,
    num_double: usize,
    num_int: usize,
}

impl LayerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The layer set used by the built-in problems and the pipeline.
    ///
    /// Double layers: `resis`, `heat`, `isodeg`, `deg`, `npdeg`, `itdeg`,
    /// `spicedeg`. Int layers: `holeflag`, `isoflag`.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for name in ["resis", "heat", "isodeg", "deg", "npdeg", "itdeg", "spicedeg"] {
            registry.entries.insert(
                name.to_string(),
                LayerSlot {
                    kind: LayerKind::Double,
                    slot: registry.num_double,
                },
            );
            registry.num_double += 1;
        }
        for name in ["holeflag", "isoflag"] {
            registry.entries.insert(
                name.to_string(),
                LayerSlot {
                    kind: LayerKind::Int,
                    slot: registry.num_int,
                },
            );
            registry.num_int += 1;
        }
        registry
    }

    /// Build a registry from an explicit layer table.
    ///
    /// Indices within each kind must be unique and cover `0..count`.
    pub fn from_specs(specs: &[LayerSpec]) -> Result<Self> {
        let mut registry = Self::new();
        for kind in [LayerKind::Double, LayerKind::Int] {
            let mut indices: Vec<usize> = specs
                .iter()
                .filter(|s| s.kind == kind)
                .map(|s| s.index)
                .collect();
            indices.sort_unstable();
            if indices.iter().enumerate().any(|(i, &idx)| i != idx) {
                return Err(Error::InvalidLayerTable(format!(
                    "{} layer indices {:?} are not a dense range starting at 0",
                    kind, indices
                )));
            }
            match kind {
                LayerKind::Double => registry.num_double = indices.len(),
                LayerKind::Int => registry.num_int = indices.len(),
            }
        }
        for spec in specs {
            if registry.entries.contains_key(&spec.name) {
                return Err(Error::DuplicateLayer {
                    name: spec.name.clone(),
                });
            }
            registry.entries.insert(
                spec.name.clone(),
                LayerSlot {
                    kind: spec.kind,
                    slot: spec.index,
                },
            );
        }
        Ok(registry)
    }

    /// Register a new layer in the next free slot of `kind`.
    pub fn register(&mut self, name: &str, kind: LayerKind) -> Result<usize> {
        if self.entries.contains_key(name) {
            return Err(Error::DuplicateLayer {
                name: name.to_string(),
            });
        }
        let slot = match kind {
            LayerKind::Double => {
                self.num_double += 1;
                self.num_double - 1
            }
            LayerKind::Int => {
                self.num_int += 1;
                self.num_int - 1
            }
        };
        self.entries.insert(name.to_string(), LayerSlot { kind, slot });
        Ok(slot)
    }

    /// Number of floating-point layers.
    pub fn num_double(&self) -> usize {
        self.num_double
    }

    /// Number of integer layers.
    pub fn num_int(&self) -> usize {
        self.num_int
    }

    /// Look up a floating-point layer by name.
    pub fn double(&self, name: &str) -> Result<DoubleLayer> {
        self.lookup(name, LayerKind::Double).map(DoubleLayer)
    }

    /// Look up an integer layer by name.
    pub fn int(&self, name: &str) -> Result<IntLayer> {
        self.lookup(name, LayerKind::Int).map(IntLayer)
    }

    /// Names in registration order, with their kind and slot.
    pub fn iter(&self) -> impl Iterator<Item = (&str, LayerKind, usize)> {
        self.entries
            .iter()
            .map(|(name, s)| (name.as_str(), s.kind, s.slot))
    }

    /// Export the registry as a layer table.
    pub fn to_specs(&self) -> Vec<LayerSpec> {
        self.iter()
            .map(|(name, kind, index)| LayerSpec {
                index,
                kind,
                name: name.to_string(),
            })
            .collect()
    }

    fn lookup(&self, name: &str, kind: LayerKind) -> Result<usize> {
        match self.entries.get(name) {
            Some(s) if s.kind == kind => Ok(s.slot),
            Some(s) => Err(Error::LayerKindMismatch {
                name: name.to_string(),
                expected: kind,
                actual: s.kind,
            }),
            None => Err(Error::MissingLayer {
                name: name.to_string(),
                kind,
            }),
        }
    }
}

/// Typed handles for every layer the thermal pipeline touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThermalLayers {
    /// Per-square resistance of each cell.
    pub resis: DoubleLayer,
    /// Injected heat (power) per cell.
    pub heat: DoubleLayer,
    /// Fixed temperature of boundary cells.
    pub isodeg: DoubleLayer,
    /// Primary computed temperature.
    pub deg: DoubleLayer,
    /// Boundary flag (1 = fixed temperature).
    pub isoflag: IntLayer,
    /// Hole flag (-1 = hole); overwritten with node ids by the indexer.
    pub holeflag: IntLayer,
    /// Dense reference temperatures, when registered.
    pub npdeg: Option<DoubleLayer>,
    /// Iterative solver temperatures, when registered.
    pub itdeg: Option<DoubleLayer>,
    /// External circuit simulator temperatures, when registered.
    pub spicedeg: Option<DoubleLayer>,
}

impl ThermalLayers {
    /// Resolve all names against a registry.
    pub fn resolve(registry: &LayerRegistry) -> Result<Self> {
        let optional = |name: &str| match registry.double(name) {
            Ok(layer) => Ok(Some(layer)),
            Err(Error::MissingLayer { .. }) => Ok(None),
            Err(e) => Err(e),
        };
        Ok(Self {
            resis: registry.double("resis")?,
            heat: registry.double("heat")?,
            isodeg: registry.double("isodeg")?,
            deg: registry.double("deg")?,
            isoflag: registry.int("isoflag")?,
            holeflag: registry.int("holeflag")?,
            npdeg: optional("npdeg")?,
            itdeg: optional("itdeg")?,
            spicedeg: optional("spicedeg")?,
        })
    }
}
