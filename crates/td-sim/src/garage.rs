//! Cars that have a dispatch but have not yet entered the network.

use td_core::{Car, CarIdx, Tick};

use crate::road::Track;
use crate::state::{CarState, CarStatus};

/// Dispatched cars waiting for release, kept in ascending car order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Garage {
    cars: Vec<CarIdx>,
}

impl Garage {
    pub fn len(&self) -> usize {
        self.cars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CarIdx> + '_ {
        self.cars.iter().copied()
    }

    pub(crate) fn insert(&mut self, car: CarIdx) {
        if let Err(at) = self.cars.binary_search(&car) {
            self.cars.insert(at, car);
        }
    }

    /// Release every car whose start tick has come, in ascending car order,
    /// up to `cap` cars.  A car whose first edge has no room stays parked and
    /// does not count against the cap.  Cars with an empty route leave
    /// straight away.
    ///
    /// Returns the released cars; those that left at once are also pushed
    /// onto `arrivals`.
    pub(crate) fn release(
        &mut self,
        now: Tick,
        cap: Option<usize>,
        tracks: &mut [Track],
        status: &mut [CarStatus],
        cars: &[Car],
        arrivals: &mut Vec<CarIdx>,
    ) -> Vec<CarIdx> {
        let limit = cap.unwrap_or(usize::MAX);

        // Pass 1: decide who leaves.
        let mut released = Vec::new();
        for &car in &self.cars {
            if released.len() >= limit {
                break;
            }
            let Some(dispatch) = status[car.index()].dispatch.as_ref() else { continue };
            if dispatch.start > now {
                continue;
            }
            match dispatch.route.first().copied() {
                None => {
                    let st = &mut status[car.index()];
                    st.state = CarState::OffRoad;
                    st.departed = Some(now);
                    st.arrived = Some(now);
                    arrivals.push(car);
                    released.push(car);
                }
                Some(edge) => {
                    if tracks[edge.index()].put_car_on_road(car, status, cars) {
                        let st = &mut status[car.index()];
                        st.hop = 0;
                        st.departed = Some(now);
                        released.push(car);
                    }
                }
            }
        }

        // Pass 2: drop them from the garage.
        if !released.is_empty() {
            self.cars.retain(|c| released.binary_search(c).is_err());
        }
        released
    }
}
