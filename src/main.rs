use std::{fs::File, io::BufWriter, process::exit};

extern crate nalgebra as na;

mod observers;
mod postprocessing;
mod preprocessing;
mod task;

use clap::Parser;
use preprocessing::cli::CliArgs;
use tracing::{error, info};

fn main() {
    tracing_subscriber::fmt::init();

    let args = CliArgs::parse();
    let input = args.create_input();

    if let Some(savepath) = args.input_json_savepath() {
        let saved = File::create(savepath)
            .map_err(|err| err.to_string())
            .and_then(|file| {
                serde_json::to_writer_pretty(BufWriter::new(file), &input)
                    .map_err(|err| err.to_string())
            });

        match saved {
            Ok(()) => info!("Saved input file to {:?}", savepath),
            Err(err) => {
                error!("Failed to save input file: {}", err);
                exit(1);
            }
        }
    }

    input.log();

    let fluid = input.build_fluid().unwrap_or_else(|err| {
        error!("Failed to set up the simulation: {}", err);
        exit(1);
    });

    let sim_thread = task::spawn_sim_thread(input.clone(), fluid);
    let output = sim_thread.join().unwrap_or_else(|_| {
        error!("Simulation thread panicked");
        exit(1);
    });

    postprocessing::postprocess(input, output);
}
