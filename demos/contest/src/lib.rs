//! Shared setup for the contest tools: logging, input loading, and the
//! dispatcher configuration file.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use td_core::{Car, DispatchConfig};
use td_network::{load_cars_file, load_network, RoadNetwork};

/// Log to stderr so stdout carries only the result.  The level comes from
/// `TD_LOG` (`error`, `warn`, `info`, `debug`, `trace`), default `info`.
pub fn initialize_logging() -> Result<()> {
    let level = match std::env::var("TD_LOG") {
        Ok(v) => v
            .parse::<LevelFilter>()
            .with_context(|| format!("Invalid TD_LOG level {v:?}"))?,
        Err(_) => LevelFilter::Info,
    };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
        .context("Failed to initialize logging")
}

/// Everything read from the three input files.
pub struct Inputs {
    pub network: Arc<RoadNetwork>,
    pub cars: Vec<Car>,
}

pub fn load_inputs(car_path: &Path, road_path: &Path, cross_path: &Path) -> Result<Inputs> {
    let network = load_network(road_path, cross_path)
        .with_context(|| format!("Failed to load {} / {}", road_path.display(), cross_path.display()))?;
    let cars = load_cars_file(car_path)
        .with_context(|| format!("Failed to read cars from {}", car_path.display()))?;
    log::info!("loaded {} cars", cars.len());
    Ok(Inputs { network: Arc::new(network), cars })
}

/// Read a JSON dispatcher configuration; fields left out keep their
/// defaults.  `None` gives the default configuration.
pub fn load_config(path: Option<&Path>) -> Result<DispatchConfig> {
    let Some(path) = path else {
        return Ok(DispatchConfig::default());
    };
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let config: DispatchConfig = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config.validate().context("Invalid dispatcher configuration")?;
    Ok(config)
}
