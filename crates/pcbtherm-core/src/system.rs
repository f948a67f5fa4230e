//! Linear system storage.
//!
//! [`LinearSystem`] is a triplet accumulator plus a dense right-hand side.
//! Backends build whatever representation they need from the triplets
//! (faer CSC, [`CsrMatrix`], dense) and never mutate the system itself.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Linear system `A x = b` with sparse triplet storage.
///
/// Duplicate triplets at the same position are summed when a matrix is
/// built from them.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    /// The right-hand side vector.
    pub rhs: DVector<f64>,
    /// Number of temperature unknowns.
    pub num_nodes: usize,
    /// Unknowns appended after the temperatures (saddle-point boundaries).
    pub num_extra: usize,
    /// Triplet accumulator: (row, col, value).
    pub triplets: Vec<(usize, usize, f64)>,
}

impl LinearSystem {
    pub fn new(num_nodes: usize, num_extra: usize) -> Self {
        Self {
            rhs: DVector::zeros(num_nodes + num_extra),
            num_nodes,
            num_extra,
            triplets: Vec::new(),
        }
    }

    /// Total number of unknowns.
    pub fn size(&self) -> usize {
        self.num_nodes + self.num_extra
    }

    /// Add a value to the coefficient matrix at (row, col).
    pub fn add_element(&mut self, row: usize, col: usize, value: f64) {
        self.triplets.push((row, col, value));
    }

    /// Add a value to the RHS vector at the given row.
    pub fn add_rhs(&mut self, row: usize, value: f64) {
        self.rhs[row] += value;
    }

    /// Stamp a conductance between two unknowns, or to the reference when
    /// one side is `None`.
    pub fn stamp_conductance(&mut self, node_i: Option<usize>, node_j: Option<usize>, g: f64) {
        if let Some(i) = node_i {
            self.add_element(i, i, g);
        }
        if let Some(j) = node_j {
            self.add_element(j, j, g);
        }
        if let (Some(i), Some(j)) = (node_i, node_j) {
            self.add_element(i, j, -g);
            self.add_element(j, i, -g);
        }
    }

    /// Build a dense matrix from the triplets.
    pub fn to_dense_matrix(&self) -> DMatrix<f64> {
        let size = self.size();
        let mut matrix = DMatrix::zeros(size, size);
        for &(row, col, value) in &self.triplets {
            matrix[(row, col)] += value;
        }
        matrix
    }

    /// Build a compressed-row matrix from the triplets.
    pub fn to_csr(&self) -> CsrMatrix {
        CsrMatrix::from_triplets(self.size(), self.size(), &self.triplets)
    }

    /// Summed diagonal entries.
    pub fn diagonal(&self) -> Vec<f64> {
        let mut diag = vec![0.0; self.size()];
        for &(row, col, value) in &self.triplets {
            if row == col {
                diag[row] += value;
            }
        }
        diag
    }

    /// `A * x` computed directly from the triplets.
    pub fn apply(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.size() {
            return Err(Error::DimensionMismatch {
                expected: self.size(),
                actual: x.len(),
            });
        }
        let mut y = vec![0.0; self.size()];
        for &(row, col, value) in &self.triplets {
            y[row] += value * x[col];
        }
        Ok(y)
    }
}

/// Compressed sparse row matrix with summed duplicates and sorted columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Build from `(row, col, value)` triplets. Entries at the same position
    /// are summed; an entry that sums to zero is still stored.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut sorted: Vec<(usize, usize, f64)> = triplets.to_vec();
        sorted.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut row_ptr = vec![0usize; nrows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(sorted.len());
        let mut values: Vec<f64> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;

        for (row, col, value) in sorted {
            if last == Some((row, col)) {
                if let Some(v) = values.last_mut() {
                    *v += value;
                }
                continue;
            }
            last = Some((row, col));
            col_idx.push(col);
            values.push(value);
            row_ptr[row + 1] += 1;
        }
        for r in 0..nrows {
            row_ptr[r + 1] += row_ptr[r];
        }

        Self {
            nrows,
            ncols,
            row_ptr,
            col_idx,
            values,
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values of one row.
    pub fn row(&self, row: usize) -> (&[usize], &[f64]) {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        (&self.col_idx[range.clone()], &self.values[range])
    }

    /// Stored entries per row.
    pub fn row_counts(&self) -> Vec<usize> {
        self.row_ptr.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Value at `(row, col)`, zero when not stored.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (cols, vals) = self.row(row);
        cols.binary_search(&col).map_or(0.0, |k| vals[k])
    }

    /// All stored entries in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.nrows).flat_map(move |r| {
            let (cols, vals) = self.row(r);
            cols.iter().zip(vals.iter()).map(move |(&c, &v)| (r, c, v))
        })
    }

    /// Entries as triplets.
    pub fn to_triplets(&self) -> Vec<(usize, usize, f64)> {
        self.iter().collect()
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.nrows, self.ncols);
        for (r, c, v) in self.iter() {
            m[(r, c)] = v;
        }
        m
    }

    /// `y = A * x`.
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.ncols);
        assert_eq!(y.len(), self.nrows);
        for (r, yr) in y.iter_mut().enumerate() {
            let (cols, vals) = self.row(r);
            *yr = cols.iter().zip(vals).map(|(&c, &v)| v * x[c]).sum();
        }
    }

    /// Whether `A[i,j] == A[j,i]` within `tol` for every stored entry.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        self.nrows == self.ncols && self.iter().all(|(r, c, v)| (self.get(c, r) - v).abs() <= tol)
    }
}

/// Full `N×N` copy of the assembled matrix, captured only for small systems.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseShadow {
    matrix: DMatrix<f64>,
}

impl DenseShadow {
    pub fn capture(system: &LinearSystem) -> Self {
        Self {
            matrix: system.to_dense_matrix(),
        }
    }

    pub fn size(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix[(row, col)]
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }
}

/// How fixed-temperature cells enter the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryStrategy {
    /// Shunt conductance on the diagonal plus an equivalent current source.
    #[default]
    Norton,
    /// Deprecated: one virtual boundary node and one source-current unknown
    /// per boundary cell. The matrix is symmetric but indefinite.
    SaddlePoint,
}

impl BoundaryStrategy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "norton" => Some(Self::Norton),
            "saddle_point" | "saddle" | "saddlepoint" => Some(Self::SaddlePoint),
            _ => None,
        }
    }
}

/// A fixed-temperature node and its reservoir conductance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundaryRecord {
    pub node: usize,
    pub temperature: f64,
    pub conductance: f64,
}

/// Undirected conductance between two neighboring nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
    pub conductance: f64,
}

impl Edge {
    /// Series resistance of the edge, `1/G`.
    pub fn resistance(&self) -> f64 {
        1.0 / self.conductance
    }
}

/// What an unknown of the system stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Interior cell temperature.
    Node,
    /// Temperature of a fixed-temperature cell.
    Boundary,
    /// Saddle-point reservoir node.
    VirtualBoundary,
    /// Saddle-point source current.
    SourceCurrent,
}

impl RowKind {
    pub fn label(&self) -> &'static str {
        match self {
            RowKind::Node => "node",
            RowKind::Boundary => "boundary",
            RowKind::VirtualBoundary => "virtual",
            RowKind::SourceCurrent => "source",
        }
    }
}

/// An assembled system together with the mesh data its consumers need.
#[derive(Debug, Clone)]
pub struct ThermalSystem {
    pub system: LinearSystem,
    /// Cell coordinates per node id.
    pub coords: Vec<(usize, usize)>,
    /// Injected heat per node id.
    pub heat: Vec<f64>,
    pub boundaries: Vec<BoundaryRecord>,
    /// Right and down neighbor links, each listed once.
    pub edges: Vec<Edge>,
    pub damping: f64,
    pub bound_cond: f64,
    pub strategy: BoundaryStrategy,
    pub shadow: Option<DenseShadow>,
}

impl ThermalSystem {
    /// Number of temperature unknowns.
    pub fn node_count(&self) -> usize {
        self.system.num_nodes
    }

    /// Total number of unknowns.
    pub fn size(&self) -> usize {
        self.system.size()
    }

    /// Whether every row belongs to a cell temperature.
    pub fn is_node_only(&self) -> bool {
        self.system.num_extra == 0
    }

    pub fn row_kind(&self, row: usize) -> RowKind {
        let n = self.node_count();
        if row >= n {
            return if (row - n) % 2 == 0 {
                RowKind::VirtualBoundary
            } else {
                RowKind::SourceCurrent
            };
        }
        if self.boundaries.iter().any(|b| b.node == row) {
            RowKind::Boundary
        } else {
            RowKind::Node
        }
    }

    /// Cell coordinates of a row, when it stands for a cell.
    ///
    /// Saddle-point rows report the coordinates of the cell they belong to.
    pub fn row_location(&self, row: usize) -> Option<(usize, usize)> {
        let n = self.node_count();
        if row < n {
            return self.coords.get(row).copied();
        }
        let record = self.boundaries.get((row - n) / 2)?;
        self.coords.get(record.node).copied()
    }

    /// Temperature part of a full solution vector.
    pub fn temperatures<'a>(&self, x: &'a [f64]) -> &'a [f64] {
        &x[..self.node_count().min(x.len())]
    }
}
