// Incompressible smoke simulation timestepping

use na::DMatrix;
use rand::Rng;
use tracing::warn;

use crate::{
    ScalarField,
    sim::{
        BoundaryPattern, FieldKind, FluidError, MacGrid, advection, boundary, numeric, poisson,
    },
};

/// High-level simulation object. Owns the grid and the solver parameters,
/// and advances the fields one tick at a time.
///
/// Stability is the caller's concern: keep `over_relaxation` below 2 and
/// `dt` small enough that no velocity crosses more than about one cell per
/// tick (see [`Fluid::cfl_number`]). Violations show up as diverging
/// fields, not as errors.
#[derive(Clone, Debug)]
pub struct Fluid {
    /// The fluid density
    density: f64,

    /// SOR factor applied to every pressure correction
    over_relaxation: f64,

    /// All field storage
    grid: MacGrid,
}

impl Fluid {
    /// Create a new simulation with a closed box boundary and all fields at
    /// zero.
    ///
    /// Parameters
    /// - `density` - The fluid density
    /// - `inner_nx` - Number of simulated cells along x
    /// - `inner_ny` - Number of simulated cells along y
    /// - `h` - The cell size
    /// - `over_relaxation` - The pressure solver's SOR factor
    pub fn new(
        density: f64,
        inner_nx: usize,
        inner_ny: usize,
        h: f64,
        over_relaxation: f64,
    ) -> Result<Self, FluidError> {
        if !(density.is_finite() && density > 0.) {
            return Err(FluidError::InvalidDensity(density));
        }
        if !over_relaxation.is_finite() {
            return Err(FluidError::InvalidOverRelaxation(over_relaxation));
        }
        if !(1.0..2.0).contains(&over_relaxation) {
            warn!(
                "Over-relaxation {} is outside [1, 2); the pressure solve may converge slowly or diverge",
                over_relaxation
            );
        }

        let mut grid = MacGrid::new(inner_nx, inner_ny, h)?;
        boundary::set_box_boundary(&mut grid);

        Ok(Fluid {
            density,
            over_relaxation,
            grid,
        })
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn over_relaxation(&self) -> f64 {
        self.over_relaxation
    }

    pub fn grid(&self) -> &MacGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut MacGrid {
        &mut self.grid
    }

    /// Advance the simulation by one tick: gravity, pressure projection,
    /// ghost-layer extrapolation, then velocity and smoke advection.
    ///
    /// Parameters
    /// - `dt` - The timestep
    /// - `gravity` - Vertical acceleration (negative points down)
    /// - `iterations` - Number of pressure solver sweeps
    pub fn simulate(&mut self, dt: f64, gravity: f64, iterations: usize) {
        self.integrate(dt, gravity);
        self.project(iterations, dt);
        self.extrapolate_boundaries();
        self.advect_velocity(dt);
        self.advect_scalar(dt);
    }

    /// Add `gravity * dt` to every v-face with fluid on both sides.
    pub fn integrate(&mut self, dt: f64, gravity: f64) {
        let (num_x, num_y) = (self.grid.num_x(), self.grid.num_y());
        let MacGrid { v, s, .. } = &mut self.grid;

        for i in 1..num_x {
            for j in 1..num_y - 1 {
                if s[(i, j)] != 0. && s[(i, j - 1)] != 0. {
                    v[(i, j)] += gravity * dt;
                }
            }
        }
    }

    /// Reset the pressure and run `iterations` projection sweeps.
    pub fn project(&mut self, iterations: usize, dt: f64) {
        self.grid.p.fill(0.);
        poisson::project(
            &mut self.grid,
            iterations,
            dt,
            self.density,
            self.over_relaxation,
        );
    }

    pub fn extrapolate_boundaries(&mut self) {
        boundary::extrapolate_boundaries(&mut self.grid);
    }

    pub fn advect_velocity(&mut self, dt: f64) {
        advection::advect_velocity(&mut self.grid, dt);
    }

    pub fn advect_scalar(&mut self, dt: f64) {
        advection::advect_scalar(&mut self.grid, dt);
    }

    pub fn set_boundary(&mut self, pattern: BoundaryPattern) {
        boundary::set_boundary(&mut self.grid, pattern);
    }

    pub fn set_box_boundary(&mut self) {
        boundary::set_box_boundary(&mut self.grid);
    }

    pub fn set_channel_boundary(&mut self) {
        boundary::set_channel_boundary(&mut self.grid);
    }

    /// See [`boundary::set_circle_obstacle`]
    pub fn set_circle_obstacle(&mut self, center_x: f64, center_y: f64, radius: f64) -> usize {
        boundary::set_circle_obstacle(&mut self.grid, center_x, center_y, radius)
    }

    /// See [`boundary::set_moving_circle_obstacle`]
    pub fn set_moving_circle_obstacle(
        &mut self,
        center_x: f64,
        center_y: f64,
        radius: f64,
        velocity: (f64, f64),
    ) -> usize {
        boundary::set_moving_circle_obstacle(&mut self.grid, center_x, center_y, radius, velocity)
    }

    /// See [`boundary::stamp_mask`]
    pub fn stamp_mask(&mut self, mask: &DMatrix<bool>) -> Result<(), FluidError> {
        boundary::stamp_mask(&mut self.grid, mask)
    }

    /// Fill every face between two fluid cells with a uniform random value
    /// in `[-magnitude, magnitude]`. Faces touching a solid are left as is.
    pub fn randomize_velocity<R: Rng>(&mut self, rng: &mut R, magnitude: f64) {
        let (num_x, num_y) = (self.grid.num_x(), self.grid.num_y());
        let MacGrid { u, v, s, .. } = &mut self.grid;

        for i in 1..num_x {
            for j in 0..num_y {
                if s[(i, j)] != 0. && s[(i - 1, j)] != 0. {
                    u[(i, j)] = rng.random_range(-magnitude..=magnitude);
                }
            }
        }
        for i in 0..num_x {
            for j in 1..num_y {
                if s[(i, j)] != 0. && s[(i, j - 1)] != 0. {
                    v[(i, j)] = rng.random_range(-magnitude..=magnitude);
                }
            }
        }
    }

    pub fn u(&self) -> &ScalarField {
        self.grid.u()
    }

    pub fn v(&self) -> &ScalarField {
        self.grid.v()
    }

    pub fn pressure(&self) -> &ScalarField {
        self.grid.pressure()
    }

    pub fn solid(&self) -> &ScalarField {
        self.grid.solid()
    }

    pub fn mass(&self) -> &ScalarField {
        self.grid.mass()
    }

    pub fn sample(&self, x: f64, y: f64, kind: FieldKind) -> f64 {
        self.grid.sample(x, y, kind)
    }

    pub fn divergence_field(&self) -> ScalarField {
        numeric::divergence_field(&self.grid)
    }

    pub fn max_divergence(&self) -> f64 {
        numeric::max_divergence(&self.grid)
    }

    pub fn speed_field(&self) -> ScalarField {
        numeric::speed_field(&self.grid)
    }

    pub fn max_speed(&self) -> f64 {
        numeric::max_speed(&self.grid)
    }

    /// Cells travelled per tick by the fastest stored velocity
    pub fn cfl_number(&self, dt: f64) -> f64 {
        self.max_speed() * dt / self.grid.h()
    }

    /// Largest timestep keeping the CFL number at `cfl`; `None` while the
    /// fluid is at rest.
    pub fn stable_timestep(&self, cfl: f64) -> Option<f64> {
        let max_speed = self.max_speed();

        (max_speed > 0.).then(|| cfl * self.grid.h() / max_speed)
    }

    /// Whether every field is free of NaN and infinities
    pub fn is_finite(&self) -> bool {
        let g = &self.grid;

        [g.u(), g.v(), g.pressure(), g.mass()]
            .iter()
            .all(|field| field.iter().all(|x| x.is_finite()))
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn all_zero(field: &ScalarField) -> bool {
        field.iter().all(|x| *x == 0.)
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(matches!(
            Fluid::new(0., 10, 10, 1., 1.9),
            Err(FluidError::InvalidDensity(_))
        ));
        assert!(matches!(
            Fluid::new(1000., 0, 10, 1., 1.9),
            Err(FluidError::EmptyGrid { .. })
        ));
        assert!(matches!(
            Fluid::new(1000., 10, 10, -0.5, 1.9),
            Err(FluidError::InvalidCellSize(_))
        ));
        assert!(matches!(
            Fluid::new(1000., 10, 10, 1., f64::INFINITY),
            Err(FluidError::InvalidOverRelaxation(_))
        ));
        // unusual but legal tuning
        assert!(Fluid::new(1000., 10, 10, 1., 2.5).is_ok());
    }

    #[test]
    fn test_concrete_closed_box_scenario() {
        let mut fluid = Fluid::new(1000., 10, 10, 1., 1.9).unwrap();
        assert_eq!(fluid.grid().num_x(), 12);
        assert_eq!(fluid.grid().num_y(), 12);

        fluid.simulate(1. / 60., 0., 40);

        assert!(fluid.max_divergence() < 1e-6);
        assert!(all_zero(fluid.u()));
        assert!(all_zero(fluid.v()));
        assert!(all_zero(fluid.pressure()));
        assert!(all_zero(fluid.mass()));
    }

    #[test]
    fn test_enclosed_domain_stays_at_rest() {
        let mut fluid = Fluid::new(1.0, 16, 12, 0.05, 1.9).unwrap();

        for _ in 0..25 {
            fluid.simulate(0.01, 0., 40);
        }

        assert!(all_zero(fluid.u()));
        assert!(all_zero(fluid.v()));
        assert!(all_zero(fluid.pressure()));
    }

    #[test]
    fn test_gravity_skips_faces_touching_solids() {
        let mut fluid = Fluid::new(1000., 4, 4, 1., 1.9).unwrap();
        fluid.set_circle_obstacle(3.5, 3.5, 0.4);

        fluid.integrate(0.5, -2.);

        // bottom wall face and obstacle faces untouched
        assert_eq!(fluid.v()[(2, 1)], 0.);
        assert_eq!(fluid.v()[(3, 3)], 0.);
        assert_eq!(fluid.v()[(3, 4)], 0.);
        // ghost column is solid
        assert_eq!(fluid.v()[(5, 2)], 0.);
        // open faces get g * dt
        assert_eq!(fluid.v()[(2, 2)], -1.);
        assert_eq!(fluid.v()[(4, 4)], -1.);
    }

    #[test]
    fn test_pressure_is_reset_each_tick() {
        let mut fluid = Fluid::new(1000., 1, 1, 1., 1.).unwrap();
        fluid.set_channel_boundary();
        fluid.grid_mut().u_mut()[(2, 1)] = 1.;

        fluid.project(1, 0.1);
        assert!((fluid.pressure()[(1, 1)] + 5000.).abs() < 1e-9);

        // already divergence free: a fresh projection leaves zero pressure
        fluid.project(1, 0.1);
        assert_eq!(fluid.pressure()[(1, 1)], 0.);
    }

    #[test]
    fn test_randomize_is_reproducible() {
        let mut a = Fluid::new(1.0, 8, 8, 0.1, 1.9).unwrap();
        let mut b = a.clone();
        let mut c = a.clone();

        a.randomize_velocity(&mut StdRng::seed_from_u64(3), 1.);
        b.randomize_velocity(&mut StdRng::seed_from_u64(3), 1.);
        c.randomize_velocity(&mut StdRng::seed_from_u64(4), 1.);

        assert_eq!(a.u(), b.u());
        assert_eq!(a.v(), b.v());
        assert_ne!(a.u(), c.u());
        assert!(a.u().iter().all(|u| u.abs() <= 1.));

        // faces against the box walls are not touched
        for j in 0..10 {
            assert_eq!(a.u()[(1, j)], 0.);
            assert_eq!(a.u()[(9, j)], 0.);
        }
        for i in 0..10 {
            assert_eq!(a.v()[(i, 1)], 0.);
            assert_eq!(a.v()[(i, 9)], 0.);
        }
    }

    #[test]
    fn test_projection_removes_random_divergence() {
        let mut fluid = Fluid::new(1000., 12, 10, 0.1, 1.9).unwrap();
        fluid.set_channel_boundary();
        fluid.randomize_velocity(&mut StdRng::seed_from_u64(11), 1.);

        let before = fluid.max_divergence();
        let div_before = fluid.divergence_field();
        // white noise excites the slowest modes; at w = 1.9 every sweep
        // only shrinks them by about 0.9, so 40 sweeps are not enough
        fluid.project(400, 0.01);

        assert!(before > 0.1);
        assert_eq!(div_before.amax(), before);
        assert!(fluid.max_divergence() < 1e-6);
        assert!(fluid.divergence_field().amax() < 1e-6);
        assert!(fluid.is_finite());
    }

    #[test]
    fn test_simulate_keeps_open_channel_divergence_free() {
        let mut fluid = Fluid::new(1000., 12, 10, 0.1, 1.9).unwrap();
        fluid.set_channel_boundary();
        fluid.grid_mut().u_mut().fill(1.);

        for _ in 0..10 {
            fluid.simulate(0.01, 0., 40);
            assert!(fluid.max_divergence() < 1e-6);
        }

        assert!(fluid.u().iter().all(|u| (u - 1.).abs() < 1e-12));
        assert!(all_zero(fluid.pressure()));
    }

    #[test]
    fn test_obstacle_interior_stays_impermeable() {
        let mut fluid = Fluid::new(1000., 24, 12, 0.1, 1.9).unwrap();
        fluid.set_channel_boundary();
        fluid.set_circle_obstacle(1.0, 0.7, 0.35);
        for j in 1..13 {
            fluid.grid_mut().u_mut()[(1, j)] = 1.;
        }

        for _ in 0..10 {
            fluid.simulate(0.01, -9.81, 60);
        }

        let g = fluid.grid();
        let mut checked = 0;
        for i in 2..g.num_x() - 1 {
            for j in 2..g.num_y() - 1 {
                if !g.is_fluid(i, j) && !g.is_fluid(i - 1, j) {
                    assert_eq!(g.u()[(i, j)], 0., "u face ({i}, {j})");
                    checked += 1;
                }
                if !g.is_fluid(i, j) && !g.is_fluid(i, j - 1) {
                    assert_eq!(g.v()[(i, j)], 0., "v face ({i}, {j})");
                    checked += 1;
                }
            }
        }
        assert!(checked > 0);
        assert!(fluid.is_finite());
    }

    #[test]
    fn test_cfl_helpers() {
        let mut fluid = Fluid::new(1.0, 4, 4, 0.5, 1.9).unwrap();
        assert_eq!(fluid.stable_timestep(1.), None);

        fluid.grid_mut().u_mut()[(2, 2)] = -4.;

        assert_eq!(fluid.max_speed(), 4.);
        assert_eq!(fluid.cfl_number(0.25), 2.);
        assert_eq!(fluid.stable_timestep(0.5), Some(0.0625));
    }
}
