// Staggered (MAC) grid storage

use na::DMatrix;

use crate::{
    ScalarField,
    sim::{FieldKind, FluidError, sampler},
};

/// Field storage for a staggered grid padded by one ghost layer per side.
///
/// Every field has shape `(num_x, num_y)` with `num_x = inner_nx + 2` and
/// `num_y = inner_ny + 2`, indexed `(i, j)` where `i` runs along x.
/// - `u[(i, j)]` is the horizontal velocity on the face between cells
///   `(i - 1, j)` and `(i, j)`
/// - `v[(i, j)]` is the vertical velocity on the face between cells
///   `(i, j - 1)` and `(i, j)`
/// - `p`, `s` and `m` are cell centered
///
/// Indices `0` and `num_x - 1` / `num_y - 1` form the ghost ring.
#[derive(Clone, Debug)]
pub struct MacGrid {
    /// Number of cells along x, ghost cells included
    num_x: usize,

    /// Number of cells along y, ghost cells included
    num_y: usize,

    /// Edge length of each (square) cell
    h: f64,

    pub(crate) u: ScalarField,
    pub(crate) v: ScalarField,
    pub(crate) new_u: ScalarField,
    pub(crate) new_v: ScalarField,

    /// Pressure, rebuilt from zero by every projection
    pub(crate) p: ScalarField,

    /// Permeability: 1.0 is fluid, 0.0 is solid
    pub(crate) s: ScalarField,

    /// Smoke marker
    pub(crate) m: ScalarField,
    pub(crate) new_m: ScalarField,
}

impl MacGrid {
    /// Allocate all fields for an `inner_nx` x `inner_ny` domain.
    ///
    /// Parameters
    /// - `inner_nx` - Number of simulated cells along x
    /// - `inner_ny` - Number of simulated cells along y
    /// - `h` - The cell size
    ///
    /// Returns
    /// - A zeroed grid whose mask is entirely solid, or a `FluidError` when
    ///   the dimensions or the cell size are unusable.
    pub fn new(inner_nx: usize, inner_ny: usize, h: f64) -> Result<Self, FluidError> {
        if inner_nx == 0 || inner_ny == 0 {
            return Err(FluidError::EmptyGrid {
                nx: inner_nx,
                ny: inner_ny,
            });
        }
        if !(h.is_finite() && h > 0.) {
            return Err(FluidError::InvalidCellSize(h));
        }

        // byte size of one field must fit an allocation
        let (num_x, num_y) = inner_nx
            .checked_add(2)
            .zip(inner_ny.checked_add(2))
            .filter(|(num_x, num_y)| {
                num_x
                    .checked_mul(*num_y)
                    .and_then(|cells| cells.checked_mul(size_of::<f64>()))
                    .is_some_and(|bytes| bytes <= isize::MAX as usize)
            })
            .ok_or(FluidError::GridTooLarge {
                nx: inner_nx,
                ny: inner_ny,
            })?;
        let zeros: ScalarField = DMatrix::zeros(num_x, num_y);

        Ok(MacGrid {
            num_x,
            num_y,
            h,
            u: zeros.clone(),
            v: zeros.clone(),
            new_u: zeros.clone(),
            new_v: zeros.clone(),
            p: zeros.clone(),
            s: zeros.clone(),
            m: zeros.clone(),
            new_m: zeros,
        })
    }

    pub fn num_x(&self) -> usize {
        self.num_x
    }

    pub fn num_y(&self) -> usize {
        self.num_y
    }

    pub fn h(&self) -> f64 {
        self.h
    }

    /// Physical extent `(width, height)` of the padded grid
    pub fn extent(&self) -> (f64, f64) {
        (self.num_x as f64 * self.h, self.num_y as f64 * self.h)
    }

    pub fn u(&self) -> &ScalarField {
        &self.u
    }

    pub fn v(&self) -> &ScalarField {
        &self.v
    }

    pub fn pressure(&self) -> &ScalarField {
        &self.p
    }

    pub fn solid(&self) -> &ScalarField {
        &self.s
    }

    pub fn mass(&self) -> &ScalarField {
        &self.m
    }

    /// Direct write access for inlet columns and other setup values
    pub fn u_mut(&mut self) -> &mut ScalarField {
        &mut self.u
    }

    pub fn v_mut(&mut self) -> &mut ScalarField {
        &mut self.v
    }

    pub fn mass_mut(&mut self) -> &mut ScalarField {
        &mut self.m
    }

    /// Raw mask access. Values written here should stay binary.
    pub fn solid_mut(&mut self) -> &mut ScalarField {
        &mut self.s
    }

    pub fn is_fluid(&self, i: usize, j: usize) -> bool {
        self.s[(i, j)] != 0.
    }

    pub fn is_interior(&self, i: usize, j: usize) -> bool {
        (1..self.num_x - 1).contains(&i) && (1..self.num_y - 1).contains(&j)
    }

    /// Physical position of the u-face `(i, j)`
    pub fn u_position(&self, i: usize, j: usize) -> (f64, f64) {
        (i as f64 * self.h, (j as f64 + 0.5) * self.h)
    }

    /// Physical position of the v-face `(i, j)`
    pub fn v_position(&self, i: usize, j: usize) -> (f64, f64) {
        ((i as f64 + 0.5) * self.h, j as f64 * self.h)
    }

    /// Physical position of the center of cell `(i, j)`
    pub fn cell_center(&self, i: usize, j: usize) -> (f64, f64) {
        ((i as f64 + 0.5) * self.h, (j as f64 + 0.5) * self.h)
    }

    /// Bilinearly sample one of the live fields at a physical position
    pub fn sample(&self, x: f64, y: f64, kind: FieldKind) -> f64 {
        let field = match kind {
            FieldKind::U => &self.u,
            FieldKind::V => &self.v,
            FieldKind::Scalar => &self.m,
        };

        sampler::sample(field, kind, self.h, x, y)
    }
}
