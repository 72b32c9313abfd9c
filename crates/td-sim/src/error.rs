use thiserror::Error;

use td_core::{CarId, CoreError, Tick};
use td_network::NetworkError;

#[derive(Debug, Error)]
pub enum SimError {
    /// A tick reached its fixed point with cars still waiting on each other.
    #[error("deadlock at {tick}: {waiting} cars cannot move")]
    Deadlock { tick: Tick, waiting: usize },

    #[error("simulation exceeded the {limit}-tick limit")]
    TickLimit { limit: u64 },

    #[error("car {0} not found")]
    UnknownCar(CarId),

    #[error("car {0} already has a dispatch")]
    AlreadyDispatched(CarId),

    #[error("no snapshot saved at {0}")]
    NoSnapshot(Tick),

    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl SimError {
    /// `true` for the recoverable deadlock signal.
    pub fn is_deadlock(&self) -> bool {
        matches!(self, SimError::Deadlock { .. })
    }
}

pub type SimResult<T> = Result<T, SimError>;
