//! `td-sim`: discrete tick engine for the traffic dispatch contest.
//!
//! # Three-phase tick
//!
//! ```text
//! step():
//!   ① Roads:     every track moves its cars without crossing, repeated
//!               until a sweep changes nothing.
//!   ② Crossing:  every crossroad (ascending id) offers waiting head cars
//!               their next road, interleaved with road sweeps, until no
//!               crossroad changes state.  Cars still waiting → Deadlock.
//!   ③ Garage:    dispatched cars with start ≤ now enter their first road
//!               in ascending id order, up to the release cap.
//!   then advance the clock.
//! ```
//!
//! # Crate layout
//!
//! | Module        | Contents                                              |
//! |---------------|-------------------------------------------------------|
//! | [`scheduler`] | `Scheduler`, `TickReport`                             |
//! | [`builder`]   | `SchedulerBuilder`                                    |
//! | [`road`]      | `Track` lanes, propagation, entry slots               |
//! | [`crossroad`] | `Crossroad`, `Turn`, `Movement`, `RightOfWay` rules   |
//! | [`garage`]    | `Garage` release                                      |
//! | [`state`]     | `CarState`, `CarStatus`, `Dispatch`                   |
//! | [`snapshot`]  | `SimulationSnapshot`                                  |
//! | [`answer`]    | `AnswerRecord`, answer file reading and writing       |
//! | [`observer`]  | `SimObserver`, `NoopObserver`                         |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use td_sim::{read_answers_file, SchedulerBuilder};
//!
//! let mut scheduler = SchedulerBuilder::new(network, cars).build()?;
//! for answer in read_answers_file(answer_path)? {
//!     scheduler.update_car_from_answer(&answer)?;
//! }
//! match scheduler.step_until_finish() {
//!     Ok(done) => println!("{}", done.0),
//!     Err(e) if e.is_deadlock() => println!("-1"),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

pub mod answer;
pub mod builder;
pub mod crossroad;
pub mod error;
pub mod garage;
pub mod observer;
pub mod road;
pub mod scheduler;
pub mod snapshot;
pub mod state;

#[cfg(test)]
mod tests;

pub use answer::{read_answers_file, read_answers_reader, write_answers, write_answers_file, AnswerRecord};
pub use builder::SchedulerBuilder;
pub use crossroad::{right_of_way, Crossroad, Movement, RightOfWay, RoadOrder, StraightFirst, Turn};
pub use error::{SimError, SimResult};
pub use garage::Garage;
pub use observer::{NoopObserver, SimObserver};
pub use road::{Entry, Track};
pub use scheduler::{Scheduler, TickReport};
pub use snapshot::SimulationSnapshot;
pub use state::{CarState, CarStatus, Dispatch};
