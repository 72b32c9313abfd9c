//! replay: run an answer file through the scheduler.
//!
//! ```text
//! replay <car.txt> <road.txt> <cross.txt> <answer.txt> [config.json]
//! ```
//!
//! Prints the completion tick, or `-1` if the schedule deadlocks.  The
//! optional config is the one given to `dispatch`; only its simulator
//! section (right-of-way rule, tick limit) is used.  Answer start ticks are
//! departure ticks, so no release cap is applied.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use contest::{initialize_logging, load_config, load_inputs};
use td_core::SimConfig;
use td_sim::{read_answers_file, SchedulerBuilder};

fn main() -> Result<ExitCode> {
    let args: Vec<String> = std::env::args().collect();
    if !(5..=6).contains(&args.len()) {
        eprintln!("usage: replay <car.txt> <road.txt> <cross.txt> <answer.txt> [config.json]");
        return Ok(ExitCode::from(2));
    }
    initialize_logging()?;

    let config = load_config(args.get(5).map(Path::new))?;
    let inputs = load_inputs(Path::new(&args[1]), Path::new(&args[2]), Path::new(&args[3]))?;
    let answers = read_answers_file(Path::new(&args[4]))
        .with_context(|| format!("Failed to read answers from {}", args[4]))?;

    let sim_config = SimConfig { release_cap: None, ..config.sim };
    let mut scheduler = SchedulerBuilder::new(inputs.network, inputs.cars)
        .config(sim_config)
        .build()?;
    for answer in &answers {
        scheduler
            .update_car_from_answer(answer)
            .with_context(|| format!("Invalid answer for car {}", answer.car.0))?;
    }
    log::info!("replaying {} answers", answers.len());

    let completion = match scheduler.step_until_finish() {
        Ok(t) => t.0 as i64,
        Err(e) if e.is_deadlock() => {
            log::warn!("{e}");
            -1
        }
        Err(e) => return Err(e.into()),
    };
    println!("{completion}");
    Ok(ExitCode::SUCCESS)
}
