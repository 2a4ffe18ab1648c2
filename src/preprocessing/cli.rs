use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    process::exit,
    sync::LazyLock,
};

use clap::{Parser, command};
use mac_fluid_2d::sim::{SceneKind, SceneParams, scene::CircleObstacle};
use tracing::{error, info};

use crate::preprocessing::{FrameField, ImageStreamSettings, InterfaceMode, SimulationInput};

static DEFAULT_FRAMES_PATH: LazyLock<&Path> = LazyLock::new(|| Path::new("sim-frames"));

// Raw, CLI input
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    #[arg(help = "Optional PNG image stamped into the scene as a solid obstacle.")]
    mask_path: Option<PathBuf>,

    #[arg(long, help = "An input file with pre-loaded parameters.")]
    input_json: Option<PathBuf>,

    #[arg(long, help = "Optional path to save the resolved input file to.")]
    input_json_savepath: Option<PathBuf>,

    #[arg(
        long,
        help = "The scene to run: `tank`, `wind-tunnel`, `channel` or `box`",
        default_value = "wind-tunnel"
    )]
    scene: String,

    #[arg(
        long,
        help = "The mode to run the simulation in: `frames` or `headless`",
        default_value = "frames"
    )]
    mode: String,

    #[arg(
        long,
        help = "An optional directory pointing to where frames should be saved."
    )]
    frames_dir: Option<PathBuf>,

    #[arg(
        long,
        help = "The field drawn into frames: `smoke`, `pressure` or `speed`",
        default_value = "smoke"
    )]
    frame_field: String,

    #[arg(long, help = "Save a frame every N ticks.", default_value = "1")]
    frame_stride: usize,

    #[arg(
        long,
        help = "Delete the frames once the run summary has been written.",
        default_value = "false"
    )]
    discard_frames: bool,

    #[arg(long, help = "Cells along the domain height (scene default if omitted).")]
    resolution: Option<usize>,

    #[arg(long, help = "Domain width over height.", default_value = "1.6")]
    aspect_ratio: f64,

    #[arg(long, help = "Domain height in meters.", default_value = "1.0")]
    domain_height: f64,

    #[arg(long, help = "Inlet velocity (m/s), or random velocity scale for `box`.")]
    inflow: Option<f64>,

    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Gravity (m/s^2, negative is down). Scene default if omitted."
    )]
    gravity: Option<f64>,

    #[arg(long, help = "Obstacle center x in meters.")]
    obstacle_x: Option<f64>,

    #[arg(long, help = "Obstacle center y in meters.")]
    obstacle_y: Option<f64>,

    #[arg(long, help = "Obstacle radius in meters; 0 removes the obstacle.")]
    obstacle_radius: Option<f64>,

    #[arg(
        short,
        long,
        default_value = "10",
        help = "Simulation time in seconds."
    )]
    simtime: f64,

    #[arg(long, default_value = "0.016666666666666666", help = "Timestep in seconds")]
    dt: f64,

    #[arg(long, default_value = "1000.0", help = "Fluid density in kg/m^3")]
    density: f64,

    #[arg(long, default_value = "1.9", help = "Over-relaxation factor of the pressure solve")]
    over_relaxation: f64,

    #[arg(long, default_value = "40", help = "Pressure solver sweeps per tick")]
    iterations: usize,

    #[arg(long, default_value = "0", help = "Seed for scenes with random initial velocity")]
    seed: u64,
}

impl CliArgs {
    pub fn input_json_savepath(&self) -> Option<&Path> {
        self.input_json_savepath.as_deref()
    }

    pub fn create_input(&self) -> SimulationInput {
        // if the input file is supplied, just use that
        if let Some(input_filepath) = &self.input_json {
            if !input_filepath.exists() {
                error!("Input file {:?} does not exist.", input_filepath);
                exit(1);
            }
            if input_filepath.is_dir() {
                error!("Input file {:?} is a directory.", input_filepath);
                exit(1);
            }

            info!(
                "Using input file {}",
                input_filepath.to_str().unwrap_or("<unknown>")
            );

            let input_file = File::open(input_filepath).unwrap_or_else(|err| {
                error!("Failed to open input file: {:?}", err);
                exit(1);
            });

            let reader = BufReader::new(input_file);
            let mut loaded_input: SimulationInput =
                serde_json::from_reader(reader).unwrap_or_else(|err| {
                    error!("Failed to deserialize input file: {:?}", err);
                    exit(1);
                });

            if loaded_input.mask_path.is_none() {
                loaded_input.mask_path = self.mask_path.clone();
            }

            return loaded_input;
        }

        // otherwise, build the input from the other arguments
        self.build_input().unwrap_or_else(|msg| {
            error!("{}", msg);
            exit(1);
        })
    }

    fn build_input(&self) -> Result<SimulationInput, String> {
        let kind = parse_scene(&self.scene)?;

        let mode = match self.mode.as_str() {
            "frames" => {
                let frames_dir = self
                    .frames_dir
                    .as_ref()
                    .map(PathBuf::from)
                    .unwrap_or((*DEFAULT_FRAMES_PATH).into());

                InterfaceMode::ImageStream(ImageStreamSettings {
                    frames_dir,
                    retain_frames: !self.discard_frames,
                    field: parse_frame_field(&self.frame_field)?,
                    stride: self.frame_stride.max(1),
                })
            }
            "headless" => InterfaceMode::Headless,
            _ => {
                return Err(format!(
                    "'{}' is not a valid interface mode. Use --help for info.",
                    self.mode
                ));
            }
        };

        if !(self.dt.is_finite() && self.dt > 0.) {
            return Err(format!("The timestep must be positive (got {}).", self.dt));
        }

        // lay the scene out for the final resolution so default obstacles land
        // where the preset expects them
        let resolution = self.resolution.unwrap_or(kind.defaults().resolution);
        let defaults = kind.params(resolution, self.domain_height);
        let mut scene = SceneParams {
            aspect_ratio: self.aspect_ratio,
            density: self.density,
            over_relaxation: self.over_relaxation,
            inflow: self.inflow.unwrap_or(defaults.inflow),
            ..defaults
        };

        scene.obstacle = match (scene.obstacle, self.obstacle_radius) {
            (_, Some(r)) if r <= 0. => None,
            (Some(default), r) => Some(CircleObstacle::new(
                self.obstacle_x.unwrap_or(default.x),
                self.obstacle_y.unwrap_or(default.y),
                r.unwrap_or(default.radius),
            )),
            (None, Some(r)) => {
                let (x, y) = match (self.obstacle_x, self.obstacle_y) {
                    (Some(x), Some(y)) => (x, y),
                    _ => {
                        return Err(
                            "--obstacle-radius needs --obstacle-x and --obstacle-y for this scene."
                                .into(),
                        );
                    }
                };
                Some(CircleObstacle::new(x, y, r))
            }
            (None, None) => None,
        };

        Ok(SimulationInput {
            mode,
            scene,
            mask_path: self.mask_path.clone(),
            simulation_time: self.simtime,
            dt: self.dt,
            gravity: self.gravity.unwrap_or(kind.gravity()),
            iterations: self.iterations,
            seed: self.seed,
        })
    }
}

fn parse_scene(name: &str) -> Result<SceneKind, String> {
    match name {
        "tank" => Ok(SceneKind::Tank),
        "wind-tunnel" => Ok(SceneKind::WindTunnel),
        "channel" => Ok(SceneKind::Channel),
        "box" => Ok(SceneKind::Box),
        _ => Err(format!(
            "'{}' is not a valid scene. Use --help for info.",
            name
        )),
    }
}

fn parse_frame_field(name: &str) -> Result<FrameField, String> {
    match name {
        "smoke" => Ok(FrameField::Smoke),
        "pressure" => Ok(FrameField::Pressure),
        "speed" => Ok(FrameField::Speed),
        _ => Err(format!(
            "'{}' is not a valid frame field. Use --help for info.",
            name
        )),
    }
}
