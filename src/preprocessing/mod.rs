use std::path::PathBuf;

use mac_fluid_2d::sim::{Fluid, FluidError, SceneParams};
use na::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::preprocessing::image_input::mask_from_image;

pub mod cli;
pub mod image_input;

/// Which field a frame shows
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameField {
    Smoke,
    Pressure,
    Speed,
}

impl FrameField {
    /// Owned copy of the field, ready to hand to another thread
    pub fn extract(self, fluid: &Fluid) -> DMatrix<f64> {
        match self {
            FrameField::Smoke => fluid.mass().clone_owned(),
            FrameField::Pressure => fluid.pressure().clone_owned(),
            FrameField::Speed => fluid.speed_field(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub struct ImageStreamSettings {
    pub frames_dir: PathBuf,
    pub retain_frames: bool,
    pub field: FrameField,

    /// Write one frame every `stride` ticks
    pub stride: usize,
}

#[derive(Serialize, Deserialize, Clone)]
pub enum InterfaceMode {
    ImageStream(ImageStreamSettings),
    Headless,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SimulationInput {
    pub mode: InterfaceMode,
    pub scene: SceneParams,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_path: Option<PathBuf>, // PNG obstacle stamped on top of the scene
    pub simulation_time: f64,
    pub dt: f64,
    pub gravity: f64,
    pub iterations: usize,
    pub seed: u64,
}

/// Failures while turning a `SimulationInput` into a runnable fluid
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Fluid(#[from] FluidError),

    #[error("failed to load obstacle mask: {0}")]
    Mask(String),
}

impl SimulationInput {
    /// Build the scene and stamp the optional PNG obstacle into it
    pub fn build_fluid(&self) -> Result<Fluid, SetupError> {
        use rand::{SeedableRng, rngs::StdRng};

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut fluid = self.scene.build(&mut rng)?;

        if let Some(mask_path) = &self.mask_path {
            let (num_x, num_y) = (fluid.grid().num_x(), fluid.grid().num_y());
            let mask = mask_from_image(mask_path, num_x, num_y)
                .map_err(|err| SetupError::Mask(err.to_string()))?;

            fluid.stamp_mask(&mask)?;
            info!("Stamped obstacle mask from {:?}", mask_path);
        }

        Ok(fluid)
    }

    /// Number of ticks needed to cover the simulation time
    pub fn tick_count(&self) -> usize {
        // tolerate rounding in time / dt before taking the ceiling
        (self.simulation_time / self.dt - 1e-9).ceil().max(0.) as usize
    }

    pub fn log(&self) {
        let (nx, ny) = self.scene.dimensions();

        info!(
            "Simulation is shown below:\n\n\
        \t scene:           {:?}\n\
        \t grid:            {} x {} cells (h = {} m)\n\
        \t time range:      {} s ({} ticks of {} s)\n\
        \t inflow:          {} m/s\n\
        \t gravity:         {} m/s^2\n\
        \t density:         {} kg/m^3\n\
        \t over-relaxation: {}\n\
        \t iterations:      {}\n\
        \t seed:            {}\n\n\
        ",
            self.scene.kind,
            nx,
            ny,
            self.scene.cell_size(),
            self.simulation_time,
            self.tick_count(),
            self.dt,
            self.scene.inflow,
            self.gravity,
            self.scene.density,
            self.scene.over_relaxation,
            self.iterations,
            self.seed,
        );

        match serde_json::to_string_pretty(&self.mode) {
            Ok(mode_str) => info!("Mode parameters are:\n\n{}", mode_str),
            Err(err) => info!("Mode parameters could not be displayed: {:?}", err),
        }
    }
}
