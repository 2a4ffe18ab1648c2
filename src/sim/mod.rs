// Solver core: grid storage, boundaries, projection and advection

pub mod advection;
pub mod boundary;
pub mod fluid;
pub mod grid;
pub mod numeric;
pub mod poisson;
pub mod sampler;
pub mod scene;

pub use boundary::BoundaryPattern;
pub use fluid::Fluid;
pub use grid::MacGrid;
pub use sampler::FieldKind;
pub use scene::{SceneKind, SceneParams};

use thiserror::Error;

/// Rejected construction or setup parameters. Solver steps themselves never
/// fail.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FluidError {
    #[error("grid must have at least one interior cell per axis (got {nx} x {ny})")]
    EmptyGrid { nx: usize, ny: usize },

    #[error("cell size must be positive and finite (got {0})")]
    InvalidCellSize(f64),

    #[error("density must be positive and finite (got {0})")]
    InvalidDensity(f64),

    #[error("over-relaxation factor must be finite (got {0})")]
    InvalidOverRelaxation(f64),

    #[error("grid of {nx} x {ny} interior cells is too large to allocate")]
    GridTooLarge { nx: usize, ny: usize },

    #[error("mask shape {got:?} does not match grid storage {expected:?}")]
    MaskShape {
        expected: (usize, usize),
        got: (usize, usize),
    },
}
