//! Per-car runtime state and the snapshot-able simulation state.

use td_core::{CarIdx, EdgeId, SimClock, Tick};

use crate::garage::Garage;
use crate::road::Track;

/// Lifecycle state of a car.
///
/// `Waiting` and `OnRoad` are both "on the network": during a tick every
/// on-road car starts `Waiting` and becomes `OnRoad` once its move for the
/// tick is settled.  Between ticks no car is `Waiting`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum CarState {
    #[default]
    InGarage,
    Waiting,
    OnRoad,
    OffRoad,
}

impl CarState {
    #[inline]
    pub fn is_on_network(self) -> bool {
        matches!(self, CarState::Waiting | CarState::OnRoad)
    }
}

/// Release tick and route assigned to a car.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dispatch {
    pub start: Tick,
    pub route: Vec<EdgeId>,
}

/// Mutable runtime state of one car.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CarStatus {
    pub state: CarState,
    /// Current edge; `EdgeId::INVALID` off the network.
    pub edge: EdgeId,
    pub lane: u32,
    /// Cells travelled on the current edge, `1..=length`.
    pub pos: u32,
    /// Index of the current edge within the route.
    pub hop: usize,
    pub dispatch: Option<Dispatch>,
    /// Tick the car actually left the garage.
    pub departed: Option<Tick>,
    /// Tick the car left the network at its destination.
    pub arrived: Option<Tick>,
}

impl CarStatus {
    /// Edge after the current one, or `None` if the current edge is the last.
    pub fn next_edge(&self) -> Option<EdgeId> {
        self.dispatch.as_ref()?.route.get(self.hop + 1).copied()
    }
}

/// Everything a tick mutates.  Cloning it is a full snapshot.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SimState {
    pub clock: SimClock,
    pub tracks: Vec<Track>,
    pub status: Vec<CarStatus>,
    pub garage: Garage,
    /// Highest load seen on each edge at a tick boundary.
    pub peak_load: Vec<f64>,
    pub on_road: usize,
    pub arrived: usize,
    /// Cars that left the network during the tick in progress.
    pub tick_arrivals: Vec<CarIdx>,
}

impl SimState {
    /// Mark every car on the network as not yet moved this tick.
    pub fn begin_tick(&mut self) {
        self.tick_arrivals.clear();
        for st in self.status.iter_mut().filter(|s| s.state == CarState::OnRoad) {
            st.state = CarState::Waiting;
        }
    }

    pub fn waiting_count(&self) -> usize {
        self.status.iter().filter(|s| s.state == CarState::Waiting).count()
    }

    pub fn record_loads(&mut self) {
        for (peak, track) in self.peak_load.iter_mut().zip(&self.tracks) {
            *peak = peak.max(track.calculate_load());
        }
    }

    pub fn car(&self, car: CarIdx) -> &CarStatus {
        &self.status[car.index()]
    }
}
