/// Task runner for the solver thread

use std::{
    sync::mpsc,
    thread::{self, JoinHandle},
};

use indicatif::{ProgressBar, ProgressStyle};
use mac_fluid_2d::sim::Fluid;
use serde::Serialize;
use tracing::{error, warn};

use crate::{
    observers::imgstream::{self, DisplayPacket},
    preprocessing::{ImageStreamSettings, InterfaceMode, SimulationInput},
};

/// Any face faster than this (m/s) means the run has blown up
const MAX_VELOCITY: f64 = 1e4;

#[derive(Serialize, Debug)]
pub struct SimulationOutput {
    pub temporal_map: Vec<f64>, // maps idx->timestamp
    pub frames_written: usize,
    pub final_max_divergence: f64,
    pub final_max_speed: f64,
    pub aborted: bool,
}

/// Steps a fluid through a run, yielding `(tick, time)` after each tick.
/// Stops at the end of the run or when the velocity field blows up.
pub struct Run {
    fluid: Fluid,
    dt: f64,
    gravity: f64,
    iterations: usize,
    ticks: usize,
    tick: usize,
    warned_cfl: bool,
    aborted: bool,
}

impl Run {
    pub fn new(fluid: Fluid, simulation_input: &SimulationInput) -> Self {
        Run {
            fluid,
            dt: simulation_input.dt,
            gravity: simulation_input.gravity,
            iterations: simulation_input.iterations,
            ticks: simulation_input.tick_count(),
            tick: 0,
            warned_cfl: false,
            aborted: false,
        }
    }

    pub fn fluid(&self) -> &Fluid {
        &self.fluid
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }

    fn finish(&self, temporal_map: Vec<f64>, frames_written: usize) -> SimulationOutput {
        SimulationOutput {
            temporal_map,
            frames_written,
            final_max_divergence: self.fluid.max_divergence(),
            final_max_speed: self.fluid.max_speed(),
            aborted: self.aborted(),
        }
    }
}

impl Iterator for Run {
    type Item = (usize, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.aborted || self.tick >= self.ticks {
            return None;
        }

        let cfl = self.fluid.cfl_number(self.dt);
        if cfl > 1. && !self.warned_cfl {
            warn!(
                "CFL number reached {:.2} at tick {}; consider a smaller timestep",
                cfl, self.tick
            );
            self.warned_cfl = true;
        }

        self.fluid.simulate(self.dt, self.gravity, self.iterations);
        self.tick += 1;

        let max_speed = self.fluid.max_speed();
        if !self.fluid.is_finite() || max_speed > MAX_VELOCITY {
            error!(
                "Velocity exploded at tick {} (max speed {}); stopping early",
                self.tick, max_speed
            );
            self.aborted = true;
            return None;
        }

        Some((self.tick, self.tick as f64 * self.dt))
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(10_000);
    if let Ok(style) = ProgressStyle::with_template(
        "[Elapsed: {elapsed_precise}] [{bar:40.cyan/blue}] {percent}% (Remaining: {eta_precise})",
    ) {
        bar.set_style(style.progress_chars("##-"));
    }
    bar
}

fn set_progress(bar: &ProgressBar, t: f64, simulation_time: f64) {
    if simulation_time > 0. {
        bar.set_position(((t / simulation_time).min(1.) * 10_000.0).round() as u64);
    }
}

/// The solver thread task to run in ImageStream mode
pub fn imgstream_task(
    settings: &ImageStreamSettings,
    mut run: Run,
    simulation_input: &SimulationInput,
) -> SimulationOutput {
    let bar = progress_bar();
    let (sender, receiver) = mpsc::channel();

    // spawn image io thread
    let frames_dir = settings.frames_dir.clone();
    let solid = run.fluid().solid().clone_owned();
    let io_thread = thread::spawn(move || {
        imgstream::image_io_loop(receiver, solid, &frames_dir).unwrap_or_else(|err| {
            error!("Frame writer failed: {}", err);
            0
        })
    });

    let stride = settings.stride.max(1);
    let mut temporal_map: Vec<f64> = Vec::new();
    let mut frame = 0;

    let mut send_frame = |run: &Run, t: f64| {
        let packet = DisplayPacket {
            field: settings.field.extract(run.fluid()),
            i: frame,
        };
        // a closed channel means the writer has already failed and logged
        if sender.send(packet).is_ok() {
            temporal_map.push(t);
            frame += 1;
        }
    };

    send_frame(&run, 0.);
    while let Some((tick, t)) = run.next() {
        if tick % stride == 0 {
            send_frame(&run, t);
        }
        set_progress(&bar, t, simulation_input.simulation_time);
    }
    drop(send_frame);
    drop(sender);
    bar.finish();

    let frames_written = io_thread.join().unwrap_or_else(|_| {
        error!("Frame writer thread panicked");
        0
    });

    run.finish(temporal_map, frames_written)
}

/// The solver thread task to run without any frame output
pub fn headless_task(mut run: Run, simulation_input: &SimulationInput) -> SimulationOutput {
    let bar = progress_bar();

    let mut temporal_map: Vec<f64> = vec![0.];
    while let Some((_, t)) = run.next() {
        set_progress(&bar, t, simulation_input.simulation_time);
        temporal_map.push(t);
    }
    bar.finish();

    run.finish(temporal_map, 0)
}

/// Spawns the simulation thread and starts the corresponding task
pub fn spawn_sim_thread(
    simulation_input: SimulationInput,
    fluid: Fluid,
) -> JoinHandle<SimulationOutput> {
    thread::spawn(move || {
        let run = Run::new(fluid, &simulation_input);

        match &simulation_input.mode {
            InterfaceMode::ImageStream(settings) => {
                imgstream_task(settings, run, &simulation_input)
            }
            InterfaceMode::Headless => headless_task(run, &simulation_input),
        }
    })
}
