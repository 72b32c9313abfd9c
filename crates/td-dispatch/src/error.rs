use thiserror::Error;

use td_core::CoreError;
use td_network::NetworkError;
use td_sim::SimError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
