//! dispatch: plan start ticks and routes for every car.
//!
//! ```text
//! dispatch <car.txt> <road.txt> <cross.txt> <answer.txt> [config.json]
//! ```
//!
//! Writes the plan to `answer.txt` and prints the completion tick of the
//! committed run, or `-1` if it deadlocked.

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;

use contest::{initialize_logging, load_config, load_inputs};
use td_dispatch::Dispatcher;
use td_sim::write_answers_file;

fn main() -> Result<ExitCode> {
    let args: Vec<String> = std::env::args().collect();
    if !(5..=6).contains(&args.len()) {
        eprintln!("usage: dispatch <car.txt> <road.txt> <cross.txt> <answer.txt> [config.json]");
        return Ok(ExitCode::from(2));
    }
    initialize_logging()?;

    let config = load_config(args.get(5).map(Path::new))?;
    let inputs = load_inputs(Path::new(&args[1]), Path::new(&args[2]), Path::new(&args[3]))?;

    let started = Instant::now();
    let mut dispatcher = Dispatcher::new(inputs.network, inputs.cars, config)?;
    let report = dispatcher.run()?;
    log::info!(
        "dispatch took {:.2?}: {} deferrals, {} rollbacks",
        started.elapsed(),
        report.deferrals,
        report.rollbacks
    );

    write_answers_file(Path::new(&args[4]), &report.plan.to_answers())?;
    println!("{}", report.completion_ticks());
    Ok(ExitCode::SUCCESS)
}
