//! Conductance matrix assembly.
//!
//! Each active cell is one unknown. Neighboring cells are joined through the
//! shared face by `G = 2 / (R_self + R_neighbor)`, i.e. two half-squares in
//! series. Fixed-temperature cells are tied to their reservoir through the
//! boundary conductance, either as a Norton equivalent (shunt plus current
//! source) or, deprecated, as explicit saddle-point unknowns.
//!
//! Assembly is row-owned: a node emits only its own row, so rows can be built
//! independently and concatenated in node order.

use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::grid::GridField;
use crate::indexer::NodeIndexer;
use crate::layers::ThermalLayers;
use crate::system::{
    BoundaryRecord, BoundaryStrategy, DenseShadow, Edge, LinearSystem, ThermalSystem,
};

/// Default size limit for capturing a dense shadow of the matrix.
pub const DEFAULT_SHADOW_LIMIT: usize = 100;

/// Assembly options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyOptions {
    /// Conductance added to every node's diagonal.
    pub damping: f64,
    /// Boundary formulation.
    pub boundary: BoundaryStrategy,
    /// A dense copy of `A` is kept when the system size is at most this.
    pub shadow_limit: usize,
    /// Build rows on the rayon pool. Only takes effect with the `parallel`
    /// feature.
    pub parallel: bool,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            damping: 0.0,
            boundary: BoundaryStrategy::Norton,
            shadow_limit: DEFAULT_SHADOW_LIMIT,
            parallel: true,
        }
    }
}

impl AssemblyOptions {
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_boundary(mut self, boundary: BoundaryStrategy) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_shadow_limit(mut self, limit: usize) -> Self {
        self.shadow_limit = limit;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Builds a [`ThermalSystem`] from a numbered grid.
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    options: AssemblyOptions,
}

/// Entries and RHS contribution of one node's row.
struct NodeRow {
    entries: Vec<(usize, usize, f64)>,
    rhs: f64,
}

/// Read-only view shared by all row builders.
struct RowContext<'a> {
    grid: &'a GridField,
    indexer: &'a NodeIndexer,
    layers: &'a ThermalLayers,
    bound_cond: f64,
    /// Boundary record index per node.
    boundary_slot: &'a [Option<usize>],
    boundaries: &'a [BoundaryRecord],
}

const NEIGHBORS: [(isize, isize); 4] = [(1, 0), (0, -1), (-1, 0), (0, 1)];

impl Assembler {
    pub fn new(options: AssemblyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    /// Assemble `A` and `b` for the active cells of `grid`.
    ///
    /// `indexer` must have been built on this grid. Every active cell needs a
    /// positive finite resistance.
    pub fn assemble(
        &self,
        grid: &GridField,
        indexer: &NodeIndexer,
        layers: &ThermalLayers,
        bound_cond: f64,
    ) -> Result<ThermalSystem> {
        let n = indexer.node_count();
        let strategy = self.options.boundary;
        if strategy == BoundaryStrategy::SaddlePoint {
            log::warn!(
                "saddle-point boundary formulation is deprecated; it adds two unknowns per boundary cell"
            );
        }

        let mut coords = Vec::with_capacity(n);
        let mut heat = Vec::with_capacity(n);
        let mut boundaries = Vec::new();
        let mut boundary_slot = vec![None; n];
        for (node, x, y) in indexer.iter() {
            let r = grid.double(x, y, layers.resis);
            if !(r > 0.0 && r.is_finite()) {
                return Err(Error::InvalidProblem(format!(
                    "cell ({x}, {y}) has non-positive resistance {r}"
                )));
            }
            coords.push((x, y));
            heat.push(grid.double(x, y, layers.heat));
            if grid.int(x, y, layers.isoflag) == 1 {
                boundary_slot[node] = Some(boundaries.len());
                boundaries.push(BoundaryRecord {
                    node,
                    temperature: grid.double(x, y, layers.isodeg),
                    conductance: bound_cond,
                });
            }
        }

        let num_extra = match strategy {
            BoundaryStrategy::Norton => 0,
            BoundaryStrategy::SaddlePoint => 2 * boundaries.len(),
        };

        let ctx = RowContext {
            grid,
            indexer,
            layers,
            bound_cond,
            boundary_slot: &boundary_slot,
            boundaries: &boundaries,
        };

        let rows = self.rows(&ctx, n);

        let mut system = LinearSystem::new(n, num_extra);
        system.triplets.reserve(rows.len() * 5 + 4 * num_extra);
        for (node, row) in rows.into_iter().enumerate() {
            system.triplets.extend(row.entries);
            system.add_rhs(node, row.rhs);
        }

        if strategy == BoundaryStrategy::SaddlePoint {
            for (k, record) in boundaries.iter().enumerate() {
                let b = n + 2 * k;
                let s = b + 1;
                system.add_element(b, b, record.conductance);
                system.add_element(b, record.node, -record.conductance);
                system.add_element(b, s, 1.0);
                system.add_element(s, b, 1.0);
                system.rhs[s] = record.temperature;
            }
        }

        let edges = collect_edges(&ctx);

        let shadow = (system.size() <= self.options.shadow_limit).then(|| DenseShadow::capture(&system));

        log::info!(
            "Assembled {} unknowns ({} nodes, {} boundary, {} edges, {} triplets)",
            system.size(),
            n,
            boundaries.len(),
            edges.len(),
            system.triplets.len()
        );
        if shadow.is_none() {
            log::debug!(
                "Dense shadow skipped: size {} exceeds limit {}",
                system.size(),
                self.options.shadow_limit
            );
        }

        Ok(ThermalSystem {
            system,
            coords,
            heat,
            boundaries,
            edges,
            damping: self.options.damping,
            bound_cond,
            strategy,
            shadow,
        })
    }

    #[cfg(feature = "parallel")]
    fn rows(&self, ctx: &RowContext<'_>, n: usize) -> Vec<NodeRow> {
        if self.options.parallel {
            (0..n)
                .into_par_iter()
                .map(|node| self.node_row(ctx, node))
                .collect()
        } else {
            (0..n).map(|node| self.node_row(ctx, node)).collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn rows(&self, ctx: &RowContext<'_>, n: usize) -> Vec<NodeRow> {
        (0..n).map(|node| self.node_row(ctx, node)).collect()
    }

    fn node_row(&self, ctx: &RowContext<'_>, node: usize) -> NodeRow {
        let (x, y) = (ctx.indexer.node_x()[node], ctx.indexer.node_y()[node]);
        let r_self = ctx.grid.double(x, y, ctx.layers.resis);

        let mut entries = Vec::with_capacity(6);
        entries.push((node, node, 0.0));
        let mut diag = self.options.damping;
        let mut rhs = ctx.grid.double(x, y, ctx.layers.heat);

        for (dx, dy) in NEIGHBORS {
            let (nx, ny) = (x as isize + dx, y as isize + dy);
            if let Some(neighbor) = ctx.indexer.node_at(ctx.grid, nx, ny) {
                let r_neighbor = ctx.grid.double(nx as usize, ny as usize, ctx.layers.resis);
                let g = 2.0 / (r_self + r_neighbor);
                diag += g;
                entries.push((node, neighbor, -g));
            }
        }

        if let Some(slot) = ctx.boundary_slot[node] {
            let record = &ctx.boundaries[slot];
            diag += ctx.bound_cond;
            match self.options.boundary {
                BoundaryStrategy::Norton => rhs += record.temperature * ctx.bound_cond,
                BoundaryStrategy::SaddlePoint => {
                    let b = ctx.indexer.node_count() + 2 * slot;
                    entries.push((node, b, -ctx.bound_cond));
                }
            }
        }

        entries[0].2 = diag;
        NodeRow { entries, rhs }
    }
}

/// Right and down links, so each undirected edge appears once.
fn collect_edges(ctx: &RowContext<'_>) -> Vec<Edge> {
    let mut edges = Vec::with_capacity(2 * ctx.indexer.node_count());
    for (node, x, y) in ctx.indexer.iter() {
        let r_self = ctx.grid.double(x, y, ctx.layers.resis);
        for (dx, dy) in [(1isize, 0isize), (0, 1)] {
            let (nx, ny) = (x as isize + dx, y as isize + dy);
            if let Some(neighbor) = ctx.indexer.node_at(ctx.grid, nx, ny) {
                let r_neighbor = ctx.grid.double(nx as usize, ny as usize, ctx.layers.resis);
                edges.push(Edge {
                    a: node,
                    b: neighbor,
                    conductance: 2.0 / (r_self + r_neighbor),
                });
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerRegistry;
    use crate::material::MaterialSet;
    use crate::problem::ProblemSpec;

    fn uniform(w: usize, h: usize, r: f64) -> (GridField, ThermalLayers) {
        let registry = LayerRegistry::standard();
        let layers = ThermalLayers::resolve(&registry).unwrap();
        let mut grid = GridField::new(w, h, &registry).unwrap();
        grid.fill_double(layers.resis, 0..w, 0..h, r);
        (grid, layers)
    }

    fn assemble(
        grid: &mut GridField,
        layers: &ThermalLayers,
        options: AssemblyOptions,
        bc: f64,
    ) -> ThermalSystem {
        let indexer = NodeIndexer::build(grid, layers.holeflag).unwrap();
        Assembler::new(options)
            .assemble(grid, &indexer, layers, bc)
            .unwrap()
    }

    #[test]
    fn two_cells_in_series() {
        let (mut grid, l) = uniform(2, 1, 1.0);
        grid.set_double(1, 0, l.resis, 3.0);
        let sys = assemble(&mut grid, &l, AssemblyOptions::default(), 10.0);
        let a = sys.system.to_dense_matrix();
        // G = 2 / (1 + 3)
        assert!((a[(0, 1)] + 0.5).abs() < 1e-15);
        assert!((a[(1, 0)] + 0.5).abs() < 1e-15);
        assert!((a[(0, 0)] - 0.5).abs() < 1e-15);
        assert_eq!(sys.edges.len(), 1);
        assert!((sys.edges[0].resistance() - 2.0).abs() < 1e-15);
    }

    #[test]
    fn norton_boundary_and_heat() {
        let (mut grid, l) = uniform(2, 1, 1.0);
        grid.set_int(0, 0, l.isoflag, 1);
        grid.set_double(0, 0, l.isodeg, 25.0);
        grid.set_double(0, 0, l.heat, 0.5);
        grid.set_double(1, 0, l.heat, 2.0);
        let sys = assemble(&mut grid, &l, AssemblyOptions::default(), 100.0);
        let a = sys.system.to_dense_matrix();

        assert!((a[(0, 0)] - 101.0).abs() < 1e-12);
        assert!((a[(1, 1)] - 1.0).abs() < 1e-12);
        assert!((sys.system.rhs[0] - (25.0 * 100.0 + 0.5)).abs() < 1e-9);
        assert!((sys.system.rhs[1] - 2.0).abs() < 1e-12);
        assert_eq!(sys.boundaries.len(), 1);
        assert_eq!(sys.boundaries[0].node, 0);
    }

    #[test]
    fn damping_on_diagonal() {
        let (mut grid, l) = uniform(1, 1, 1.0);
        let sys = assemble(&mut grid, &l, AssemblyOptions::default().with_damping(1e-6), 1.0);
        assert_eq!(sys.system.to_dense_matrix()[(0, 0)], 1e-6);
        assert_eq!(sys.damping, 1e-6);
    }

    #[test]
    fn holes_do_not_conduct() {
        let (mut grid, l) = uniform(3, 1, 1.0);
        grid.set_int(1, 0, l.holeflag, -1);
        let sys = assemble(&mut grid, &l, AssemblyOptions::default(), 1.0);
        assert_eq!(sys.node_count(), 2);
        assert!(sys.edges.is_empty());
        let a = sys.system.to_dense_matrix();
        assert_eq!(a[(0, 1)], 0.0);
        assert_eq!(a[(0, 0)], 0.0);
    }

    #[test]
    fn one_wide_mesh() {
        let (mut grid, l) = uniform(1, 4, 2.0);
        let sys = assemble(&mut grid, &l, AssemblyOptions::default(), 1.0);
        assert_eq!(sys.edges.len(), 3);
        let csr = sys.system.to_csr();
        assert_eq!(csr.row_counts(), vec![2, 3, 3, 2]);
    }

    #[test]
    fn scalable_rows_are_dominant_and_symmetric() {
        let registry = LayerRegistry::standard();
        let layers = ThermalLayers::resolve(&registry).unwrap();
        let materials = MaterialSet::default();
        let mut grid = ProblemSpec::Scalable { xsize: 12, ysize: 9 }
            .build(&registry, &layers, &materials)
            .unwrap();
        let sys = assemble(&mut grid, &layers, AssemblyOptions::default(), materials.bound_cond);
        let csr = sys.system.to_csr();
        assert!(csr.is_symmetric(0.0));

        for row in 0..sys.node_count() {
            let (cols, vals) = csr.row(row);
            let mut diag = 0.0;
            let mut off = 0.0;
            for (&c, &v) in cols.iter().zip(vals) {
                if c == row {
                    diag = v;
                } else {
                    assert!(v < 0.0);
                    off += v.abs();
                }
            }
            let expected = off
                + sys
                    .boundaries
                    .iter()
                    .find(|b| b.node == row)
                    .map_or(0.0, |b| b.conductance);
            assert!(
                (diag - expected).abs() <= 1e-9 * diag.abs(),
                "row {row}: diag {diag}, expected {expected}"
            );
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_rows_match_serial() {
        let registry = LayerRegistry::standard();
        let layers = ThermalLayers::resolve(&registry).unwrap();
        let materials = MaterialSet::default();
        for boundary in [BoundaryStrategy::Norton, BoundaryStrategy::SaddlePoint] {
            let mut grid = ProblemSpec::Scalable { xsize: 31, ysize: 17 }
                .build(&registry, &layers, &materials)
                .unwrap();
            let options = AssemblyOptions::default()
                .with_boundary(boundary)
                .with_damping(1e-3);
            let serial = assemble(
                &mut grid,
                &layers,
                options.clone().with_parallel(false),
                materials.bound_cond,
            );
            let parallel = assemble(
                &mut grid,
                &layers,
                options.with_parallel(true),
                materials.bound_cond,
            );
            assert_eq!(parallel.system.triplets, serial.system.triplets);
            assert_eq!(parallel.system.rhs, serial.system.rhs);
            assert_eq!(parallel.boundaries, serial.boundaries);
            assert_eq!(parallel.edges, serial.edges);
        }
    }

    #[test]
    fn saddle_point_layout() {
        let (mut grid, l) = uniform(2, 2, 1.0);
        grid.fill_int(l.isoflag, 0..2, 0..1, 1);
        grid.fill_double(l.isodeg, 0..2, 0..1, 25.0);
        let options = AssemblyOptions::default().with_boundary(BoundaryStrategy::SaddlePoint);
        let sys = assemble(&mut grid, &l, options, 10.0);

        assert_eq!(sys.node_count(), 4);
        assert_eq!(sys.size(), 8);
        let a = sys.system.to_dense_matrix();
        // Boundary node 0 is (0, 0); its virtual node is 4, source row 5.
        assert_eq!(a[(0, 4)], -10.0);
        assert_eq!(a[(4, 0)], -10.0);
        assert_eq!(a[(4, 4)], 10.0);
        assert_eq!(a[(4, 5)], 1.0);
        assert_eq!(a[(5, 4)], 1.0);
        assert_eq!(sys.system.rhs[5], 25.0);
        assert_eq!(sys.system.rhs[0], 0.0);
        assert_eq!(a, a.transpose());
    }

    #[test]
    fn saddle_point_matches_norton() {
        let (mut grid, l) = uniform(3, 3, 1.5);
        grid.fill_int(l.isoflag, 0..3, 0..1, 1);
        grid.fill_double(l.isodeg, 0..3, 0..1, 25.0);
        grid.set_double(1, 1, l.heat, 2.0);

        let norton = assemble(&mut grid, &l, AssemblyOptions::default(), 1000.0);
        let saddle = assemble(
            &mut grid,
            &l,
            AssemblyOptions::default().with_boundary(BoundaryStrategy::SaddlePoint),
            1000.0,
        );

        let xn = norton.system.to_dense_matrix().lu().solve(&norton.system.rhs).unwrap();
        let xs = saddle.system.to_dense_matrix().lu().solve(&saddle.system.rhs).unwrap();
        for i in 0..norton.node_count() {
            assert!(
                (xn[i] - xs[i]).abs() < 1e-9,
                "node {i}: norton {} saddle {}",
                xn[i],
                xs[i]
            );
        }
    }

    #[test]
    fn shadow_only_for_small_systems() {
        let (mut grid, l) = uniform(4, 4, 1.0);
        let small = assemble(&mut grid, &l, AssemblyOptions::default(), 1.0);
        assert_eq!(small.shadow.as_ref().map(|s| s.size()), Some(16));

        let none = assemble(&mut grid, &l, AssemblyOptions::default().with_shadow_limit(15), 1.0);
        assert!(none.shadow.is_none());
    }

    #[test]
    fn zero_resistance_rejected() {
        let (mut grid, l) = uniform(2, 2, 1.0);
        grid.set_double(1, 1, l.resis, 0.0);
        let indexer = NodeIndexer::build(&mut grid, l.holeflag).unwrap();
        let err = Assembler::default()
            .assemble(&grid, &indexer, &l, 1.0)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidProblem(_)));
    }
}
