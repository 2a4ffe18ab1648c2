// Preset scenes: boundary layout, obstacles and initial fields

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::sim::{BoundaryPattern, Fluid, FluidError};

/// Fraction of the inlet height seeded with smoke in the flow scenes
const SMOKE_BAND: f64 = 0.1;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneKind {
    /// Open-topped tank under gravity
    Tank,
    /// Pinned inflow on the left, outlet on the right, smoke band at the inlet
    WindTunnel,
    /// Open-ended channel with a symmetric inflow and a centered obstacle
    Channel,
    /// Closed box stirred with seeded random velocities
    Box,
}

impl SceneKind {
    /// Vertical acceleration the scene runs with
    pub fn gravity(self) -> f64 {
        match self {
            SceneKind::Tank => -9.81,
            SceneKind::WindTunnel | SceneKind::Channel | SceneKind::Box => 0.,
        }
    }

    pub fn boundary(self) -> BoundaryPattern {
        match self {
            SceneKind::Tank => BoundaryPattern::Tank,
            SceneKind::WindTunnel => BoundaryPattern::WindTunnel,
            SceneKind::Channel => BoundaryPattern::Channel,
            SceneKind::Box => BoundaryPattern::Box,
        }
    }

    /// Default parameters for this scene
    pub fn defaults(self) -> SceneParams {
        let resolution = match self {
            SceneKind::Tank | SceneKind::Box => 50,
            SceneKind::WindTunnel => 100,
            SceneKind::Channel => 80,
        };

        self.params(resolution, 1.0)
    }

    /// Default parameters laid out for a given resolution and domain height.
    /// Obstacles scale with the domain height; the `Channel` obstacle sits
    /// on the mirror axis of the padded grid.
    pub fn params(self, resolution: usize, domain_height: f64) -> SceneParams {
        let mut params = SceneParams {
            kind: self,
            resolution,
            aspect_ratio: 1.6,
            domain_height,
            density: 1000.,
            over_relaxation: 1.9,
            inflow: 2.0,
            obstacle: None,
        };

        params.obstacle = match self {
            SceneKind::Tank | SceneKind::Box => None,
            SceneKind::WindTunnel => Some(CircleObstacle::new(
                0.4 * domain_height,
                0.5 * domain_height,
                0.15 * domain_height,
            )),
            SceneKind::Channel => Some(CircleObstacle::new(
                0.4 * domain_height,
                params.center_y(),
                0.15 * domain_height,
            )),
        };

        params
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct CircleObstacle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl CircleObstacle {
    pub fn new(x: f64, y: f64, radius: f64) -> Self {
        CircleObstacle { x, y, radius }
    }
}

/// Everything needed to set a scene up
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SceneParams {
    pub kind: SceneKind,

    /// Number of simulated cells along y
    pub resolution: usize,

    /// Domain width over domain height
    pub aspect_ratio: f64,

    /// Physical height of the simulated (non-ghost) domain
    pub domain_height: f64,

    pub density: f64,

    pub over_relaxation: f64,

    /// Inlet velocity for the flow scenes, random velocity scale for `Box`
    pub inflow: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub obstacle: Option<CircleObstacle>,
}

impl SceneParams {
    /// Cell size implied by the resolution
    pub fn cell_size(&self) -> f64 {
        self.domain_height / self.resolution as f64
    }

    /// Height of the horizontal mirror axis of the padded grid
    pub fn center_y(&self) -> f64 {
        0.5 * (self.resolution + 2) as f64 * self.cell_size()
    }

    /// Interior grid dimensions `(inner_nx, inner_ny)`
    pub fn dimensions(&self) -> (usize, usize) {
        let h = self.cell_size();
        let width = self.domain_height * self.aspect_ratio;

        ((width / h).floor() as usize, self.resolution)
    }

    /// Build a ready-to-run fluid for this scene.
    ///
    /// Parameters
    /// - `rng` - Source of the random velocities used by `SceneKind::Box`
    pub fn build<R: Rng>(&self, rng: &mut R) -> Result<Fluid, FluidError> {
        if self.resolution == 0 {
            return Err(FluidError::EmptyGrid { nx: 0, ny: 0 });
        }

        let h = self.cell_size();
        let (inner_nx, inner_ny) = self.dimensions();
        let mut fluid = Fluid::new(self.density, inner_nx, inner_ny, h, self.over_relaxation)?;

        fluid.set_boundary(self.kind.boundary());

        match self.kind {
            SceneKind::Tank => {}
            SceneKind::WindTunnel | SceneKind::Channel => self.seed_inflow(&mut fluid),
            SceneKind::Box => fluid.randomize_velocity(rng, self.inflow),
        }

        if let Some(obstacle) = self.obstacle {
            fluid.set_circle_obstacle(obstacle.x, obstacle.y, obstacle.radius);
        }

        info!(
            "Built {:?} scene: {}x{} cells, h = {:.4}",
            self.kind, inner_nx, inner_ny, h
        );

        Ok(fluid)
    }

    /// Inlet column of u and a centered smoke band entering with it. The
    /// band is at least one row thick and mirrors about the grid's center.
    fn seed_inflow(&self, fluid: &mut Fluid) {
        let grid = fluid.grid_mut();
        let num_y = grid.num_y();

        for j in 0..num_y {
            grid.u_mut()[(1, j)] = self.inflow;
        }

        let half_band = (0.5 * SMOKE_BAND * num_y as f64).max(0.5);
        let center = 0.5 * num_y as f64;

        for j in 0..num_y {
            if (j as f64 + 0.5 - center).abs() <= half_band {
                grid.mass_mut()[(0, j)] = 1.;
                grid.mass_mut()[(1, j)] = 1.;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn small(kind: SceneKind) -> SceneParams {
        kind.params(10, 10.)
    }

    /// u mirrors and v flips sign about the horizontal center line
    fn assert_mirror_symmetric(fluid: &Fluid, tol: f64) {
        let (num_x, num_y) = (fluid.grid().num_x(), fluid.grid().num_y());
        let (u, v, m) = (fluid.u(), fluid.v(), fluid.mass());

        for i in 0..num_x {
            for j in 1..num_y {
                let mirrored = v[(i, num_y - j)];
                assert!(
                    (v[(i, j)] + mirrored).abs() < tol,
                    "v({i}, {j}) = {} vs mirrored {}",
                    v[(i, j)],
                    mirrored
                );
            }
            for j in 0..num_y {
                assert!((u[(i, j)] - u[(i, num_y - 1 - j)]).abs() < tol, "u({i}, {j})");
                assert!((m[(i, j)] - m[(i, num_y - 1 - j)]).abs() < tol, "m({i}, {j})");
            }
        }
    }

    #[test]
    fn test_dimensions() {
        let params = small(SceneKind::Tank);

        assert_eq!(params.cell_size(), 1.);
        assert_eq!(params.dimensions(), (16, 10));
    }

    #[test]
    fn test_tank_is_open_on_top() {
        let fluid = small(SceneKind::Tank)
            .build(&mut StdRng::seed_from_u64(0))
            .unwrap();
        let g = fluid.grid();

        assert!(g.is_fluid(5, g.num_y() - 1));
        assert!(!g.is_fluid(5, 0));
        assert!(!g.is_fluid(0, 5));
        assert!(!g.is_fluid(g.num_x() - 1, 5));
        assert_eq!(SceneKind::Tank.gravity(), -9.81);
    }

    #[test]
    fn test_tank_settles_without_blowing_up() {
        let mut fluid = small(SceneKind::Tank)
            .build(&mut StdRng::seed_from_u64(0))
            .unwrap();

        for _ in 0..20 {
            fluid.simulate(1. / 60., SceneKind::Tank.gravity(), 40);
        }

        assert!(fluid.is_finite());
        // hydrostatic pressure grows with depth
        let column = fluid.grid().num_x() / 2;
        assert!(fluid.pressure()[(column, 1)] > fluid.pressure()[(column, 8)]);
    }

    #[test]
    fn test_wind_tunnel_inlet_is_pinned() {
        let params = SceneParams {
            obstacle: Some(CircleObstacle::new(5., 6., 1.5)),
            ..small(SceneKind::WindTunnel)
        };
        let mut fluid = params.build(&mut StdRng::seed_from_u64(0)).unwrap();
        let inflow = params.inflow;

        for _ in 0..5 {
            fluid.simulate(0.05, 0., 40);
        }

        let g = fluid.grid();
        for j in 1..g.num_y() - 1 {
            assert_eq!(g.u()[(1, j)], inflow, "inlet face {j}");
        }
        assert!(!g.is_fluid(5, 6));
        // the smoke source column is never advected
        assert_eq!(g.mass()[(0, 4)], 0.);
        assert_eq!(g.mass()[(0, 5)], 1.);
        assert_eq!(g.mass()[(0, 6)], 1.);
        assert_eq!(g.mass()[(0, 7)], 0.);
        assert!(g.mass().iter().any(|m| *m > 0. && *m < 1.));
    }

    #[test]
    fn test_box_scene_uses_supplied_rng() {
        let params = small(SceneKind::Box);

        let a = params.build(&mut StdRng::seed_from_u64(9)).unwrap();
        let b = params.build(&mut StdRng::seed_from_u64(9)).unwrap();

        assert_eq!(a.u(), b.u());
        assert_eq!(a.v(), b.v());
        assert!(a.max_speed() > 0.);
    }

    #[test]
    fn test_channel_flow_is_mirror_symmetric() {
        let params = SceneParams {
            obstacle: Some(CircleObstacle::new(5., 6., 1.7)),
            inflow: 1.,
            ..small(SceneKind::Channel)
        };
        let mut fluid = params.build(&mut StdRng::seed_from_u64(0)).unwrap();

        for _ in 0..3 {
            fluid.simulate(0.02, 0., 500);
        }

        assert!(
            fluid.v().iter().any(|x| x.abs() > 1e-3),
            "obstacle should deflect the flow"
        );
        assert_mirror_symmetric(&fluid, 1e-8);
    }

    #[test]
    fn test_channel_preset_stays_centered_at_other_resolutions() {
        for (resolution, domain_height) in [(20, 1.), (31, 2.5)] {
            let params = SceneKind::Channel.params(resolution, domain_height);
            let obstacle = params.obstacle.unwrap();
            let mut fluid = params.build(&mut StdRng::seed_from_u64(0)).unwrap();
            let (_, height) = fluid.grid().extent();

            assert!((obstacle.y - 0.5 * height).abs() < 1e-12);
            assert_mirror_symmetric(&fluid, 1e-15);

            for _ in 0..3 {
                fluid.simulate(1. / 60., 0., 600);
            }

            assert!(fluid.v().iter().any(|x| x.abs() > 1e-3));
            assert_mirror_symmetric(&fluid, 1e-8);
        }
    }

    #[test]
    fn test_smoke_band_is_centered() {
        for resolution in [8, 9, 20, 33] {
            let fluid = SceneKind::Channel
                .params(resolution, 1.)
                .build(&mut StdRng::seed_from_u64(0))
                .unwrap();
            let num_y = fluid.grid().num_y();
            let column: Vec<f64> = (0..num_y).map(|j| fluid.mass()[(0, j)]).collect();

            assert!(column.iter().any(|m| *m == 1.), "empty band at {resolution}");
            for j in 0..num_y {
                assert_eq!(column[j], column[num_y - 1 - j], "row {j} at {resolution}");
            }
        }
    }

    #[test]
    fn test_oversized_domain_is_rejected() {
        let params = SceneParams {
            aspect_ratio: 1e30,
            ..small(SceneKind::Tank)
        };

        assert!(matches!(
            params.build(&mut StdRng::seed_from_u64(0)),
            Err(FluidError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn test_params_round_trip_through_json() {
        let params = SceneKind::WindTunnel.defaults();

        let serialized = serde_json::to_string(&params).unwrap();
        let deserialized: SceneParams = serde_json::from_str(&serialized).unwrap();

        assert_eq!(params, deserialized);
    }
}
