//! Mesh data store.

use std::ops::Range;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::layers::{DoubleLayer, IntLayer, LayerRegistry};

/// Rectangular cell grid with parallel floating-point and integer layer arrays.
///
/// Cells are stored with `x` as the outer index and `y` as the inner index,
/// so a scan `for x { for y { .. } }` walks memory linearly. Both arrays are
/// allocated once; the grid is never resized.
#[derive(Debug, Clone)]
pub struct GridField {
    width: usize,
    height: usize,
    num_double: usize,
    num_int: usize,
    doubles: Vec<f64>,
    ints: Vec<i32>,
}

/// Summary of one floating-point layer over the active cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub count: usize,
}

impl GridField {
    /// Allocate a zero-filled grid with the layer depth of `registry`.
    pub fn new(width: usize, height: usize, registry: &LayerRegistry) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidMeshSize { width, height });
        }
        let cells = width * height;
        Ok(Self {
            width,
            height,
            num_double: registry.num_double(),
            num_int: registry.num_int(),
            doubles: vec![0.0; cells * registry.num_double()],
            ints: vec![0; cells * registry.num_int()],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells, holes included.
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Whether a signed coordinate lies inside the mesh.
    pub fn contains(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Return an error if `(x, y)` is outside the mesh.
    pub fn check(&self, x: usize, y: usize) -> Result<()> {
        if x < self.width && y < self.height {
            Ok(())
        } else {
            Err(Error::CoordinateOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    #[inline]
    fn cell(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height, "cell ({x}, {y}) out of bounds");
        x * self.height + y
    }

    /// Read a floating-point layer value. Panics if `(x, y)` is outside the mesh.
    #[inline]
    pub fn double(&self, x: usize, y: usize, layer: DoubleLayer) -> f64 {
        self.doubles[self.cell(x, y) * self.num_double + layer.0]
    }

    #[inline]
    pub fn set_double(&mut self, x: usize, y: usize, layer: DoubleLayer, value: f64) {
        let idx = self.cell(x, y) * self.num_double + layer.0;
        self.doubles[idx] = value;
    }

    /// Read an integer layer value. Panics if `(x, y)` is outside the mesh.
    #[inline]
    pub fn int(&self, x: usize, y: usize, layer: IntLayer) -> i32 {
        self.ints[self.cell(x, y) * self.num_int + layer.0]
    }

    #[inline]
    pub fn set_int(&mut self, x: usize, y: usize, layer: IntLayer, value: i32) {
        let idx = self.cell(x, y) * self.num_int + layer.0;
        self.ints[idx] = value;
    }

    /// Set `layer` to `value` over the rectangle `xs × ys`, clamped to the mesh.
    pub fn fill_double(&mut self, layer: DoubleLayer, xs: Range<usize>, ys: Range<usize>, value: f64) {
        for x in xs.start..xs.end.min(self.width) {
            for y in ys.start..ys.end.min(self.height) {
                self.set_double(x, y, layer, value);
            }
        }
    }

    /// Set `layer` to `value` over the rectangle `xs × ys`, clamped to the mesh.
    pub fn fill_int(&mut self, layer: IntLayer, xs: Range<usize>, ys: Range<usize>, value: i32) {
        for x in xs.start..xs.end.min(self.width) {
            for y in ys.start..ys.end.min(self.height) {
                self.set_int(x, y, layer, value);
            }
        }
    }

    /// All values of a floating-point layer in scan order (x outer, y inner).
    pub fn double_layer_values(&self, layer: DoubleLayer) -> Vec<f64> {
        self.doubles
            .iter()
            .skip(layer.0)
            .step_by(self.num_double.max(1))
            .copied()
            .collect()
    }

    /// Min/max/mean of `layer` over cells whose `active` flag is non-negative.
    ///
    /// Returns `None` when no cell is active.
    pub fn layer_stats(&self, layer: DoubleLayer, active: IntLayer) -> Option<LayerStats> {
        let mut stats = LayerStats {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            mean: 0.0,
            count: 0,
        };
        let mut sum = 0.0;
        for x in 0..self.width {
            for y in 0..self.height {
                if self.int(x, y, active) < 0 {
                    continue;
                }
                let v = self.double(x, y, layer);
                stats.min = stats.min.min(v);
                stats.max = stats.max.max(v);
                sum += v;
                stats.count += 1;
            }
        }
        if stats.count == 0 {
            return None;
        }
        stats.mean = sum / stats.count as f64;
        Some(stats)
    }
}
