//! `td-dispatch`: router and admission controller.
//!
//! Decides when each car leaves its garage and which roads it takes, then
//! runs the plan through the `td-sim` scheduler to measure it.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                  |
//! |----------------|-----------------------------------------------------------|
//! | [`dispatcher`] | `Dispatcher` admission loop, `Plan`, `DispatchReport`     |
//! | [`queue`]      | `ReleaseQueue`, `Pending` (release priority)              |
//! | [`cohort`]     | direction accumulator and two-cohort partition            |
//! | [`calibrate`]  | trial-run weight calibration                              |
//! | [`error`]      | `DispatchError`, `DispatchResult<T>`                      |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! let network = Arc::new(load_network(&road_path, &cross_path)?);
//! let cars = load_cars_file(&car_path)?;
//! let mut dispatcher = Dispatcher::new(network, cars, DispatchConfig::default())?;
//! let report = dispatcher.run()?;
//! write_answers_file(&answer_path, &report.plan.to_answers())?;
//! println!("{}", report.completion_ticks());
//! ```

pub mod calibrate;
pub mod cohort;
pub mod dispatcher;
pub mod error;
pub mod queue;


pub use calibrate::{road_usage, select_roads};
pub use cohort::{direction_score, partition};
pub use dispatcher::{shrink, DispatchReport, Dispatcher, Plan, PlanEntry};
pub use error::{DispatchError, DispatchResult};
pub use queue::{Pending, ReleaseQueue};
