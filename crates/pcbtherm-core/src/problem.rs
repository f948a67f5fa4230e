//! Built-in test problems.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::GridField;
use crate::layers::{LayerRegistry, ThermalLayers};
use crate::material::MaterialSet;

/// Boundary temperature of the built-in problems, in °C.
pub const AMBIENT_DEGREES: f64 = 25.0;

/// Total power injected by the scalable problem.
pub const SCALABLE_HEAT: f64 = 10.0;

/// Heat injected at the center of the tiny problem.
pub const TINY_HEAT: f64 = 2.0;

/// A problem definition that populates a fresh [`GridField`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProblemSpec {
    /// 3×3 FR-4 square, bottom row held at 25 °C, 2 W in the center cell.
    Tiny,
    /// FR-4 field with a copper heat block, copper crossbars, a 25 °C
    /// boundary ring and one hole at (1,1); scales to any size from 4×4.
    Scalable { xsize: usize, ysize: usize },
}

impl Default for ProblemSpec {
    fn default() -> Self {
        ProblemSpec::Scalable {
            xsize: 20,
            ysize: 20,
        }
    }
}

impl ProblemSpec {
    pub fn name(&self) -> &'static str {
        match self {
            ProblemSpec::Tiny => "tiny",
            ProblemSpec::Scalable { .. } => "scalable",
        }
    }

    /// Mesh dimensions this problem allocates.
    pub fn size(&self) -> (usize, usize) {
        match *self {
            ProblemSpec::Tiny => (3, 3),
            ProblemSpec::Scalable { xsize, ysize } => (xsize, ysize),
        }
    }

    /// Allocate and populate a grid for this problem.
    pub fn build(
        &self,
        registry: &LayerRegistry,
        layers: &ThermalLayers,
        materials: &MaterialSet,
    ) -> Result<GridField> {
        let (width, height) = self.size();
        let mut grid = GridField::new(width, height, registry)?;
        match self {
            ProblemSpec::Tiny => define_tiny(&mut grid, layers, materials)?,
            ProblemSpec::Scalable { .. } => define_scalable(&mut grid, layers, materials)?,
        }
        log::info!("Defined {} problem on a {}x{} mesh", self.name(), width, height);
        Ok(grid)
    }
}

fn define_tiny(grid: &mut GridField, l: &ThermalLayers, m: &MaterialSet) -> Result<()> {
    let fr4 = m.fr4.resistance_per_square()?;
    grid.fill_double(l.resis, 0..3, 0..3, fr4);
    grid.fill_int(l.isoflag, 0..3, 0..1, 1);
    grid.fill_double(l.isodeg, 0..3, 0..1, AMBIENT_DEGREES);
    grid.set_double(1, 1, l.heat, TINY_HEAT);
    Ok(())
}

/// Smallest scalable mesh edge. From 4 cells up the heat block starts at
/// index 2 or later, clear of the hole at (1,1).
pub const SCALABLE_MIN_SIZE: usize = 4;

/// Round half away from zero and clamp to `[0, limit]`.
fn frac(extent: usize, fraction: f64, limit: usize) -> usize {
    ((extent as f64 * fraction).round().max(0.0) as usize).min(limit)
}

fn define_scalable(grid: &mut GridField, l: &ThermalLayers, m: &MaterialSet) -> Result<()> {
    let (w, h) = (grid.width(), grid.height());
    if w < SCALABLE_MIN_SIZE || h < SCALABLE_MIN_SIZE {
        return Err(Error::InvalidProblem(format!(
            "scalable problem needs at least {SCALABLE_MIN_SIZE}x{SCALABLE_MIN_SIZE} cells, got {w}x{h}"
        )));
    }
    let fr4 = m.fr4.resistance_per_square()?;
    let copper = m.copper.resistance_per_square()?;

    grid.fill_double(l.resis, 0..w, 0..h, fr4);

    // Heat block centered at 50% with 25% extents.
    let (center, extent) = (0.5, 0.25);
    let left = frac(w, center - extent * 0.5, w);
    let right = frac(w, center + extent * 0.5, w);
    let top = frac(h, center - extent * 0.5, h);
    let bottom = frac(h, center + extent * 0.5, h);
    let cells = (right - left) * (bottom - top);
    if cells == 0 {
        return Err(Error::InvalidProblem(format!(
            "heat block is empty on a {w}x{h} mesh"
        )));
    }
    let heat_per_cell = SCALABLE_HEAT / cells as f64;
    log::debug!("Heat per cell = {heat_per_cell} over {cells} cells");
    grid.fill_double(l.heat, left..right, top..bottom, heat_per_cell);
    grid.fill_double(l.resis, left..right, top..bottom, copper);

    // Boundary ring.
    for (xs, ys) in [(0..1, 0..h), (w - 1..w, 0..h), (0..w, 0..1), (0..w, h - 1..h)] {
        grid.fill_double(l.isodeg, xs.clone(), ys.clone(), AMBIENT_DEGREES);
        grid.fill_int(l.isoflag, xs, ys, 1);
    }

    // Copper crossbars through the center.
    let width_frac = 0.05;
    let bar_left = frac(w, center - width_frac * 0.5, w);
    let bar_right = frac(w, center + width_frac * 0.5, w);
    let bar_top = frac(h, center - width_frac * 0.5, h);
    let bar_bottom = frac(h, center + width_frac * 0.5, h);
    grid.fill_double(l.resis, 0..w, bar_top..bar_bottom, copper);
    grid.fill_double(l.resis, bar_left..bar_right, 0..h, copper);

    grid.set_int(1, 1, l.holeflag, -1);
    grid.set_int(1, 1, l.isoflag, 0);
    grid.set_double(1, 1, l.heat, 0.0);
    Ok(())
}
