// Semi-Lagrangian transport of velocity and smoke

use std::mem;

use crate::sim::{
    FieldKind, MacGrid,
    numeric::{avg_u, avg_v, cell_velocity},
    sampler::sample,
};

/// Transport both velocity components along the flow.
///
/// Each u-face whose two neighbouring cells are fluid is traced back by
/// `dt` using its own u and the average of the surrounding v-faces (and
/// symmetrically for v-faces). The pre-step field is sampled at the
/// departure point and the result written to scratch, which then replaces
/// the live fields. Faces that are not advected keep their value.
pub fn advect_velocity(grid: &mut MacGrid, dt: f64) {
    let (num_x, num_y) = (grid.num_x(), grid.num_y());
    let h = grid.h();

    grid.new_u.copy_from(&grid.u);
    grid.new_v.copy_from(&grid.v);

    let MacGrid {
        u,
        v,
        s,
        new_u,
        new_v,
        ..
    } = grid;

    for i in 1..num_x {
        for j in 1..num_y {
            // u component
            if j < num_y - 1 && s[(i, j)] != 0. && s[(i - 1, j)] != 0. {
                let (x, y) = (i as f64 * h, (j as f64 + 0.5) * h);
                let (fu, fv) = (u[(i, j)], avg_v(v, i, j));

                new_u[(i, j)] = sample(u, FieldKind::U, h, x - dt * fu, y - dt * fv);
            }

            // v component
            if i < num_x - 1 && s[(i, j)] != 0. && s[(i, j - 1)] != 0. {
                let (x, y) = ((i as f64 + 0.5) * h, j as f64 * h);
                let (fu, fv) = (avg_u(u, i, j), v[(i, j)]);

                new_v[(i, j)] = sample(v, FieldKind::V, h, x - dt * fu, y - dt * fv);
            }
        }
    }

    mem::swap(u, new_u);
    mem::swap(v, new_v);
}

/// Transport the smoke field along the flow.
///
/// Every interior fluid cell is traced back from its center using the
/// average of its own faces, and the pre-step smoke is sampled there.
/// Values are not clamped; bilinear weights keep them within the range of
/// their neighbours.
pub fn advect_scalar(grid: &mut MacGrid, dt: f64) {
    let (num_x, num_y) = (grid.num_x(), grid.num_y());
    let h = grid.h();

    grid.new_m.copy_from(&grid.m);

    let MacGrid {
        u, v, s, m, new_m, ..
    } = grid;

    for i in 1..num_x - 1 {
        for j in 1..num_y - 1 {
            if s[(i, j)] == 0. {
                continue;
            }

            let (cu, cv) = cell_velocity(u, v, i, j);
            let x = (i as f64 + 0.5) * h - dt * cu;
            let y = (j as f64 + 0.5) * h - dt * cv;

            new_m[(i, j)] = sample(m, FieldKind::Scalar, h, x, y);
        }
    }

    mem::swap(m, new_m);
}
