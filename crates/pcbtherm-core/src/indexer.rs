//! Numbering of active mesh cells.
//!
//! Every cell whose hole flag is non-negative becomes one equation. The
//! forward map lives in the hole-flag layer itself (the flag is overwritten
//! with the node id) and the inverse map is kept here.

use crate::error::{Error, Result};
use crate::grid::GridField;
use crate::layers::IntLayer;

/// Bijection between active `(x, y)` cells and node ids `[0, node_count)`.
#[derive(Debug, Clone)]
pub struct NodeIndexer {
    holeflag: IntLayer,
    node_x: Vec<usize>,
    node_y: Vec<usize>,
}

impl NodeIndexer {
    /// Number the active cells of `grid` in scan order (x outer, y inner).
    ///
    /// Cells with a hole flag of `-1` (or any negative value) are skipped and
    /// keep `-1`. Active cells get their node id written into `holeflag`, so
    /// building twice on the same grid yields the same numbering.
    pub fn build(grid: &mut GridField, holeflag: IntLayer) -> Result<Self> {
        if grid.width() == 0 || grid.height() == 0 {
            return Err(Error::InvalidMeshSize {
                width: grid.width(),
                height: grid.height(),
            });
        }

        let mut node_x = Vec::with_capacity(grid.cell_count());
        let mut node_y = Vec::with_capacity(grid.cell_count());
        for x in 0..grid.width() {
            for y in 0..grid.height() {
                if grid.int(x, y, holeflag) >= 0 {
                    grid.set_int(x, y, holeflag, node_x.len() as i32);
                    node_x.push(x);
                    node_y.push(y);
                } else {
                    grid.set_int(x, y, holeflag, -1);
                }
            }
        }

        log::debug!(
            "Numbered {} of {} cells ({}x{} mesh)",
            node_x.len(),
            grid.cell_count(),
            grid.width(),
            grid.height()
        );

        Ok(Self {
            holeflag,
            node_x,
            node_y,
        })
    }

    /// Number of active nodes.
    pub fn node_count(&self) -> usize {
        self.node_x.len()
    }

    /// Node id at `(x, y)`, or `None` for holes and coordinates outside the mesh.
    pub fn node_at(&self, grid: &GridField, x: isize, y: isize) -> Option<usize> {
        if !grid.contains(x, y) {
            return None;
        }
        let id = grid.int(x as usize, y as usize, self.holeflag);
        (id >= 0).then_some(id as usize)
    }

    /// Signed form of [`node_at`](Self::node_at): `-1` when absent.
    pub fn node_id_at(&self, grid: &GridField, x: isize, y: isize) -> i64 {
        self.node_at(grid, x, y).map_or(-1, |n| n as i64)
    }

    /// Cell coordinates of `node`.
    pub fn location(&self, node: usize) -> Result<(usize, usize)> {
        if node >= self.node_count() {
            return Err(Error::NodeOutOfRange {
                node,
                count: self.node_count(),
            });
        }
        Ok((self.node_x[node], self.node_y[node]))
    }

    /// Inverse x table, indexed by node id.
    pub fn node_x(&self) -> &[usize] {
        &self.node_x
    }

    /// Inverse y table, indexed by node id.
    pub fn node_y(&self) -> &[usize] {
        &self.node_y
    }

    /// `(node, x, y)` for every node in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.node_x
            .iter()
            .zip(self.node_y.iter())
            .enumerate()
            .map(|(n, (&x, &y))| (n, x, y))
    }

    /// The hole-flag layer holding the forward map.
    pub fn holeflag(&self) -> IntLayer {
        self.holeflag
    }
}
