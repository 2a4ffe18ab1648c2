// Discrete operators on the staggered grid

use na::DMatrix;

use crate::{ScalarField, sim::MacGrid};

/// Net outflow of cell `(i, j)`, i.e. `u[i+1][j] - u[i][j] + v[i][j+1] - v[i][j]`.
///
/// Not divided by `h`; this is the quantity the projector drives to zero.
pub fn divergence(u: &ScalarField, v: &ScalarField, i: usize, j: usize) -> f64 {
    (u[(i + 1, j)] - u[(i, j)]) + (v[(i, j + 1)] - v[(i, j)])
}

/// Divergence of every interior cell; ghost and solid cells are left at zero.
pub fn divergence_field(grid: &MacGrid) -> ScalarField {
    let (num_x, num_y) = (grid.num_x(), grid.num_y());
    let mut div: ScalarField = DMatrix::zeros(num_x, num_y);

    for i in 1..num_x - 1 {
        for j in 1..num_y - 1 {
            if grid.is_fluid(i, j) {
                div[(i, j)] = divergence(&grid.u, &grid.v, i, j);
            }
        }
    }

    div
}

/// Largest absolute divergence over interior fluid cells that have at least
/// one open neighbour. Fully enclosed cells cannot be corrected and are
/// skipped.
pub fn max_divergence(grid: &MacGrid) -> f64 {
    let (num_x, num_y) = (grid.num_x(), grid.num_y());
    let s = &grid.s;
    let mut max = 0.0f64;

    for i in 1..num_x - 1 {
        for j in 1..num_y - 1 {
            if s[(i, j)] == 0. {
                continue;
            }
            let s_total = s[(i - 1, j)] + s[(i + 1, j)] + s[(i, j - 1)] + s[(i, j + 1)];
            if s_total == 0. {
                continue;
            }
            max = max.max(divergence(&grid.u, &grid.v, i, j).abs());
        }
    }

    max
}

/// Average of the four u-faces surrounding the v-face `(i, j)`.
/// Requires `j >= 1` and `i + 1 < num_x`.
pub fn avg_u(u: &ScalarField, i: usize, j: usize) -> f64 {
    (u[(i, j - 1)] + u[(i, j)] + u[(i + 1, j - 1)] + u[(i + 1, j)]) * 0.25
}

/// Average of the four v-faces surrounding the u-face `(i, j)`.
/// Requires `i >= 1` and `j + 1 < num_y`.
pub fn avg_v(v: &ScalarField, i: usize, j: usize) -> f64 {
    (v[(i - 1, j)] + v[(i, j)] + v[(i - 1, j + 1)] + v[(i, j + 1)]) * 0.25
}

/// Velocity at the center of cell `(i, j)` from its own faces
pub fn cell_velocity(u: &ScalarField, v: &ScalarField, i: usize, j: usize) -> (f64, f64) {
    (
        (u[(i, j)] + u[(i + 1, j)]) * 0.5,
        (v[(i, j)] + v[(i, j + 1)]) * 0.5,
    )
}

/// Speed at every cell center; ghost cells are left at zero.
pub fn speed_field(grid: &MacGrid) -> ScalarField {
    let (num_x, num_y) = (grid.num_x(), grid.num_y());
    let mut speed: ScalarField = DMatrix::zeros(num_x, num_y);

    for i in 1..num_x - 1 {
        for j in 1..num_y - 1 {
            let (cu, cv) = cell_velocity(&grid.u, &grid.v, i, j);
            speed[(i, j)] = (cu * cu + cv * cv).sqrt();
        }
    }

    speed
}

/// Largest velocity component magnitude stored anywhere on the grid
pub fn max_speed(grid: &MacGrid) -> f64 {
    let max_u = grid.u.iter().fold(0.0f64, |m, &x| m.max(x.abs()));
    let max_v = grid.v.iter().fold(0.0f64, |m, &x| m.max(x.abs()));

    max_u.max(max_v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divergence() {
        let u: ScalarField = DMatrix::from_fn(4, 4, |i, _| i as f64);
        let v: ScalarField = DMatrix::from_fn(4, 4, |_, j| -2. * j as f64);

        // du = 1 per cell, dv = -2 per cell
        assert_eq!(divergence(&u, &v, 1, 1), -1.);
        assert_eq!(divergence(&u, &v, 2, 2), -1.);
    }

    #[test]
    fn test_averages() {
        let u: ScalarField = DMatrix::from_fn(4, 4, |i, j| (i + 10 * j) as f64);
        let v: ScalarField = DMatrix::from_fn(4, 4, |i, j| (i + 10 * j) as f64);

        // u(1,0), u(1,1), u(2,0), u(2,1) = 1, 11, 2, 12
        assert_eq!(avg_u(&u, 1, 1), 6.5);
        // v(0,1), v(1,1), v(0,2), v(1,2) = 10, 11, 20, 21
        assert_eq!(avg_v(&v, 1, 1), 15.5);
        assert_eq!(cell_velocity(&u, &v, 1, 1), (11.5, 16.));
    }

    #[test]
    fn test_divergence_field_skips_ghost_and_solid_cells() {
        let mut grid = MacGrid::new(3, 3, 1.).unwrap();
        for i in 1..4 {
            for j in 1..4 {
                grid.s[(i, j)] = 1.;
            }
        }
        grid.s[(3, 3)] = 0.;
        grid.u.copy_from(&DMatrix::from_fn(5, 5, |i, _| 2. * i as f64));

        let div = divergence_field(&grid);

        assert_eq!(div.shape(), (5, 5));
        assert_eq!(div[(1, 1)], 2.);
        assert_eq!(div[(2, 3)], 2.);
        assert_eq!(div[(3, 3)], 0.);
        for k in 0..5 {
            assert_eq!(div[(0, k)], 0.);
            assert_eq!(div[(4, k)], 0.);
            assert_eq!(div[(k, 0)], 0.);
            assert_eq!(div[(k, 4)], 0.);
        }
    }

    #[test]
    fn test_max_divergence_skips_enclosed_cells() {
        let mut grid = MacGrid::new(3, 3, 1.).unwrap();
        grid.s[(2, 2)] = 1.;
        grid.u[(3, 2)] = 5.;

        // the only fluid cell has no open neighbour
        assert_eq!(max_divergence(&grid), 0.);

        grid.s[(1, 2)] = 1.;
        assert_eq!(max_divergence(&grid), 5.);
    }
}
