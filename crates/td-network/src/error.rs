//! Network-subsystem error type.

use thiserror::Error;

use td_core::{CoreError, CrossId, RoadId};

/// Errors produced by `td-network`.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("no route from {from} to {to}")]
    NoRoute { from: CrossId, to: CrossId },

    #[error("cross {0} not found in network")]
    UnknownCross(CrossId),

    #[error("road {0} not found in network")]
    UnknownRoad(RoadId),

    #[error("invalid route from {from} to {to}: {reason}")]
    InvalidRoute { from: CrossId, to: CrossId, reason: String },

    #[error("invalid topology: {0}")]
    Topology(String),

    #[error("invalid edge weight {0}: weights must be finite and non-negative")]
    InvalidWeight(f64),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
