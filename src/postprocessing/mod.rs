// Contains post-processers for analyzing simulation results

use crate::{
    preprocessing::{InterfaceMode, SimulationInput},
    task::SimulationOutput,
};
use std::{
    error::Error,
    fs::{self, File},
    io::BufWriter,
    path::Path,
};
use tracing::{info, warn};

const SUMMARY_FILE: &str = "summary.json";

/// Write the frame -> time map and final diagnostics as JSON
pub fn write_summary(sim_output: &SimulationOutput, dir: &Path) -> Result<(), Box<dyn Error>> {
    let file = File::create(dir.join(SUMMARY_FILE))?;
    serde_json::to_writer_pretty(BufWriter::new(file), sim_output)?;

    Ok(())
}

/// Delete the PNG frames, leaving the summary in place
fn remove_frames(dir: &Path) -> Result<(), Box<dyn Error>> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "png") {
            fs::remove_file(path)?;
        }
    }

    Ok(())
}

pub fn postprocess(sim_input: SimulationInput, sim_output: SimulationOutput) {
    info!(
        "Run finished at t = {} s: max divergence {:.3e}, max speed {:.3} m/s{}",
        sim_output.temporal_map.last().copied().unwrap_or(0.),
        sim_output.final_max_divergence,
        sim_output.final_max_speed,
        if sim_output.aborted { " (aborted)" } else { "" }
    );

    if let InterfaceMode::ImageStream(settings) = sim_input.mode {
        info!(
            "Wrote {} frames to {:?}",
            sim_output.frames_written, settings.frames_dir
        );

        match write_summary(&sim_output, &settings.frames_dir) {
            Ok(()) => info!(
                "Wrote run summary to {:?}",
                settings.frames_dir.join(SUMMARY_FILE)
            ),
            Err(err) => warn!("Unable to write run summary: {:?}", err),
        }

        if !settings.retain_frames {
            _ = remove_frames(&settings.frames_dir)
                .inspect_err(|err| warn!("Unable to cleanup frames output: {:?}", err));
        }
    };
}
