// Pressure projection by over-relaxed Gauss-Seidel sweeps

use crate::sim::MacGrid;

/// Drive the velocity field towards zero divergence.
///
/// Runs exactly `iterations` in-place sweeps over the interior cells, `i`
/// outer and `j` inner, both excluding the ghost ring. Each fluid cell with
/// at least one open neighbour has its divergence removed (scaled by
/// `over_relaxation`) by distributing a correction over its four faces in
/// proportion to the neighbours' permeability. Corrections made earlier in
/// a sweep are seen by later cells, so the sweep order is part of the
/// result.
///
/// The pressure needed for each correction is accumulated into `grid.p`;
/// it is not fed back into the velocity. Callers reset it between ticks.
///
/// Parameters
/// - `grid` - The grid to project in place
/// - `iterations` - The number of full sweeps to run
/// - `dt` - The timestep, only used to scale the pressure
/// - `density` - The fluid density, only used to scale the pressure
/// - `over_relaxation` - The SOR factor, normally in `(1, 2)`
pub fn project(
    grid: &mut MacGrid,
    iterations: usize,
    dt: f64,
    density: f64,
    over_relaxation: f64,
) {
    let (num_x, num_y) = (grid.num_x(), grid.num_y());
    let cp = density * grid.h() / dt;

    let MacGrid { u, v, p, s, .. } = grid;

    for _ in 0..iterations {
        for i in 1..num_x - 1 {
            for j in 1..num_y - 1 {
                if s[(i, j)] == 0. {
                    continue;
                }

                let s_left = s[(i - 1, j)];
                let s_right = s[(i + 1, j)];
                let s_bottom = s[(i, j - 1)];
                let s_top = s[(i, j + 1)];
                let s_total = s_left + s_right + s_bottom + s_top;

                // enclosed cell; nothing can flow in or out
                if s_total == 0. {
                    continue;
                }

                let div = (u[(i + 1, j)] - u[(i, j)]) + (v[(i, j + 1)] - v[(i, j)]);
                let corr = -(div / s_total) * over_relaxation;

                p[(i, j)] += cp * corr;

                u[(i, j)] -= s_left * corr;
                u[(i + 1, j)] += s_right * corr;
                v[(i, j)] -= s_bottom * corr;
                v[(i, j + 1)] += s_top * corr;
            }
        }
    }
}
