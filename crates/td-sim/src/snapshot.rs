//! Full copies of the mutable simulation state for rollback.

use td_core::Tick;

use crate::state::SimState;

/// Everything needed to put a [`Scheduler`](crate::Scheduler) back to an
/// earlier tick boundary: car states and positions, lane contents, the
/// garage, the clock, and load statistics.
///
/// Restoring a snapshot and replaying the same dispatches reproduces the
/// same run exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationSnapshot {
    pub(crate) state: SimState,
}

impl SimulationSnapshot {
    /// Tick the snapshot was taken at; the next `step` processes this tick.
    pub fn tick(&self) -> Tick {
        self.state.clock.now()
    }

    pub fn on_road(&self) -> usize {
        self.state.on_road
    }

    pub fn in_garage(&self) -> usize {
        self.state.garage.len()
    }
}
