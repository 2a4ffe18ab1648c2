// Staggered-grid incompressible smoke solver

extern crate nalgebra as na;

pub mod sim;

use na::DMatrix;

/// A cell- or face-sampled field, indexed `(i, j)` with `i` along x.
pub type ScalarField = DMatrix<f64>;
