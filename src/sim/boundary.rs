// Permeability mask construction and ghost-layer velocity extrapolation

use na::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sim::{FluidError, MacGrid};

/// Which parts of the ghost ring are walls. Interior cells are always
/// reset to fluid when a pattern is applied.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryPattern {
    /// Every ghost cell is solid
    Box,
    /// Top and bottom solid; left and right open
    Channel,
    /// Left, right and bottom solid; open top
    Tank,
    /// Left, top and bottom solid; open right outlet
    WindTunnel,
}

impl BoundaryPattern {
    /// Whether ghost cell `(i, j)` is a wall under this pattern
    fn is_wall(self, i: usize, j: usize, num_x: usize, num_y: usize) -> bool {
        let (left, right) = (i == 0, i == num_x - 1);
        let (bottom, top) = (j == 0, j == num_y - 1);

        match self {
            BoundaryPattern::Box => left || right || bottom || top,
            BoundaryPattern::Channel => bottom || top,
            BoundaryPattern::Tank => left || right || bottom,
            BoundaryPattern::WindTunnel => left || bottom || top,
        }
    }
}

/// Reset the mask: interior fluid, ghost ring according to `pattern`.
pub fn set_boundary(grid: &mut MacGrid, pattern: BoundaryPattern) {
    let (num_x, num_y) = (grid.num_x(), grid.num_y());

    for i in 0..num_x {
        for j in 0..num_y {
            grid.s[(i, j)] = if pattern.is_wall(i, j, num_x, num_y) {
                0.
            } else {
                1.
            };
        }
    }

    debug!("Applied {:?} boundary to {}x{} grid", pattern, num_x, num_y);
}

pub fn set_box_boundary(grid: &mut MacGrid) {
    set_boundary(grid, BoundaryPattern::Box);
}

pub fn set_channel_boundary(grid: &mut MacGrid) {
    set_boundary(grid, BoundaryPattern::Channel);
}

/// Mark every cell whose center lies strictly within `radius` of
/// `(center_x, center_y)` as solid. Other cells keep their value, and
/// circles reaching past the domain are clipped.
///
/// Parameters
/// - `center_x`, `center_y` - Circle center in physical units
/// - `radius` - Circle radius in physical units
///
/// Returns
/// - The number of cells covered by the circle
pub fn set_circle_obstacle(grid: &mut MacGrid, center_x: f64, center_y: f64, radius: f64) -> usize {
    let covered = circle_cells(grid, center_x, center_y, radius);

    for &(i, j) in &covered {
        grid.s[(i, j)] = 0.;
    }

    debug!(
        "Stamped circle at ({}, {}) r={} over {} cells",
        center_x,
        center_y,
        radius,
        covered.len()
    );

    covered.len()
}

/// Stamp a circle that moves with `velocity`. Besides marking the cells
/// solid, the faces of every covered cell take on the obstacle velocity so
/// the projector pushes the surrounding fluid along.
pub fn set_moving_circle_obstacle(
    grid: &mut MacGrid,
    center_x: f64,
    center_y: f64,
    radius: f64,
    velocity: (f64, f64),
) -> usize {
    let covered = circle_cells(grid, center_x, center_y, radius);
    let (num_x, num_y) = (grid.num_x(), grid.num_y());
    let (vx, vy) = velocity;

    for &(i, j) in &covered {
        grid.s[(i, j)] = 0.;

        grid.u[(i, j)] = vx;
        if i + 1 < num_x {
            grid.u[(i + 1, j)] = vx;
        }
        grid.v[(i, j)] = vy;
        if j + 1 < num_y {
            grid.v[(i, j + 1)] = vy;
        }
    }

    covered.len()
}

/// Additively stamp a rasterized obstacle; `true` marks a solid cell.
/// The mask must have the grid's storage shape, otherwise nothing is
/// stamped.
pub fn stamp_mask(grid: &mut MacGrid, mask: &DMatrix<bool>) -> Result<(), FluidError> {
    if mask.shape() != grid.s.shape() {
        return Err(FluidError::MaskShape {
            expected: grid.s.shape(),
            got: mask.shape(),
        });
    }

    for (s, &solid) in grid.s.iter_mut().zip(mask.iter()) {
        if solid {
            *s = 0.;
        }
    }

    Ok(())
}

/// Cells whose centers fall strictly inside the circle
fn circle_cells(grid: &MacGrid, center_x: f64, center_y: f64, radius: f64) -> Vec<(usize, usize)> {
    let mut cells = Vec::new();
    let r2 = radius * radius;

    for i in 0..grid.num_x() {
        for j in 0..grid.num_y() {
            let (x, y) = grid.cell_center(i, j);
            let (dx, dy) = (x - center_x, y - center_y);

            if dx * dx + dy * dy < r2 {
                cells.push((i, j));
            }
        }
    }

    cells
}

/// Copy the tangential velocity of the first interior row/column into the
/// ghost layer: top/bottom rows of `u`, left/right columns of `v`.
pub fn extrapolate_boundaries(grid: &mut MacGrid) {
    let (num_x, num_y) = (grid.num_x(), grid.num_y());

    for i in 0..num_x {
        grid.u[(i, 0)] = grid.u[(i, 1)];
        grid.u[(i, num_y - 1)] = grid.u[(i, num_y - 2)];
    }

    for j in 0..num_y {
        grid.v[(0, j)] = grid.v[(1, j)];
        grid.v[(num_x - 1, j)] = grid.v[(num_x - 2, j)];
    }
}
