//! `td-network`: road network, weighted routing graph, and input loaders.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                     |
//! |-------------|--------------------------------------------------------------|
//! | [`network`] | `Cross`, `Road`, `Link`, `RoadNetwork`, `RoadNetworkBuilder` |
//! | [`graph`]   | `RoadGraph` (CSR + weights), `Route`, `LoadSource`, Dijkstra |
//! | [`loader`]  | `load_network`, `load_cars_*`, record helpers                |
//! | [`error`]   | `NetworkError`, `NetworkResult<T>`                           |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public entity types.    |

pub mod error;
pub mod graph;
pub mod loader;
pub mod network;


pub use error::{NetworkError, NetworkResult};
pub use graph::{LoadSource, NoLoad, RoadGraph, Route};
pub use loader::{load_cars_file, load_cars_reader, load_network, read_records, parse_field};
pub use network::{Compass, Cross, Link, Road, RoadNetwork, RoadNetworkBuilder};
