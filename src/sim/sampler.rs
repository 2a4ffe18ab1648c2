// Offset-aware bilinear interpolation on the staggered grid

use crate::ScalarField;

/// The staggered variant a field is stored on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Horizontal velocity on vertical faces
    U,
    /// Vertical velocity on horizontal faces
    V,
    /// Cell-centered scalar (smoke)
    Scalar,
}

impl FieldKind {
    /// Sub-cell offset `(dx, dy)` of the variant's sample points relative to
    /// the cell-corner lattice.
    pub fn offset(self, h: f64) -> (f64, f64) {
        let half = 0.5 * h;

        match self {
            FieldKind::U => (0., half),
            FieldKind::V => (half, 0.),
            FieldKind::Scalar => (half, half),
        }
    }
}

/// Bilinearly interpolate `field` at the physical position `(x, y)`.
///
/// Positions are clamped into `[h, num_x * h] x [h, num_y * h]`, so queries
/// outside the domain return edge values instead of failing.
///
/// Parameters
/// - `field` - The live field to read
/// - `kind` - Which staggered variant `field` is stored on
/// - `h` - The cell size
/// - `x`, `y` - The physical query position
///
/// Returns
/// - The interpolated value
pub fn sample(field: &ScalarField, kind: FieldKind, h: f64, x: f64, y: f64) -> f64 {
    let (num_x, num_y) = field.shape();
    let (dx, dy) = kind.offset(h);

    let x = x.clamp(h, num_x as f64 * h);
    let y = y.clamp(h, num_y as f64 * h);

    let (x0, tx) = lower_index((x - dx) / h, num_x);
    let (y0, ty) = lower_index((y - dy) / h, num_y);
    let x1 = (x0 + 1).min(num_x - 1);
    let y1 = (y0 + 1).min(num_y - 1);

    let (sx, sy) = (1. - tx, 1. - ty);

    sx * sy * field[(x0, y0)]
        + tx * sy * field[(x1, y0)]
        + tx * ty * field[(x1, y1)]
        + sx * ty * field[(x0, y1)]
}

/// Split a grid coordinate into its clamped lower index and the fraction
/// past it.
fn lower_index(g: f64, n: usize) -> (usize, f64) {
    let i = (g.floor().max(0.) as usize).min(n - 1);

    (i, g - i as f64)
}
