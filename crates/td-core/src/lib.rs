//! `td-core`: foundational types for the traffic-dispatch workspace.
//!
//! This crate is a dependency of every other `td-*` crate and has no `td-*`
//! dependencies of its own.
//!
//! # What lives here
//!
//! | Module     | Contents                                                   |
//! |------------|------------------------------------------------------------|
//! | [`ids`]    | `CrossId`, `RoadId`, `CarId`, `NodeId`, `EdgeId`, `CarIdx` |
//! | [`time`]   | `Tick`, `SimClock`                                         |
//! | [`car`]    | `Car`, immutable trip data                                 |
//! | [`config`] | `SimConfig`, `DispatchConfig` and their strategy enums     |
//! | [`error`]  | `CoreError`, `CoreResult`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod car;
pub mod config;
pub mod error;
pub mod ids;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use car::Car;
pub use config::{
    Calibration, Directionality, DispatchConfig, RightOfWayRule, SimConfig, WeightStrategy,
};
pub use error::{CoreError, CoreResult};
pub use ids::{CarId, CarIdx, CrossId, EdgeId, NodeId, RoadId};
pub use time::{SimClock, Tick};
