//! Lane tracks: per-edge car queues and in-road propagation.
//!
//! A `Track` is one directed traversal of a road.  Each lane is a queue
//! ordered front (nearest the end of the road) to back.  Positions count
//! cells travelled, `1..=length`; a car at `length` is at the stop line.
//!
//! # Propagation rule
//!
//! Within a lane, processed front to back, a `Waiting` car with speed `v`:
//!
//! | Situation                                      | Result                         |
//! |------------------------------------------------|--------------------------------|
//! | nothing ahead, `pos + v <= length`             | moves `v`, settles             |
//! | nothing ahead, `pos + v > length`              | stays `Waiting` (crossroad)    |
//! | car ahead with gap `>= v`                      | moves `v`, settles             |
//! | gap `< v`, car ahead settled                   | moves up behind it, settles    |
//! | gap `< v`, car ahead still `Waiting`           | stays `Waiting`                |

use std::collections::VecDeque;

use td_core::{Car, CarIdx, EdgeId};
use td_network::Road;

use crate::state::{CarState, CarStatus};

/// Where a car would land when entering a track.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    At { lane: u32, pos: u32 },
    /// The lowest usable lane ends in a car that has not moved yet this tick.
    Blocked,
    /// Every lane's entry cell holds a settled car.
    Full,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub edge: EdgeId,
    pub length: u32,
    pub top_speed: u32,
    lanes: Vec<VecDeque<CarIdx>>,
    count: usize,
}

impl Track {
    pub fn new(edge: EdgeId, road: &Road) -> Self {
        Self {
            edge,
            length: road.length,
            top_speed: road.top_speed,
            lanes: vec![VecDeque::new(); road.lanes as usize],
            count: 0,
        }
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Cars in `lane`, front first.
    pub fn lane(&self, lane: usize) -> impl Iterator<Item = CarIdx> + '_ {
        self.lanes[lane].iter().copied()
    }

    pub fn car_count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.lanes.len() * self.length as usize
    }

    /// Occupied fraction of all cells.
    pub fn calculate_load(&self) -> f64 {
        if self.capacity() == 0 {
            return 0.0;
        }
        self.count as f64 / self.capacity() as f64
    }

    // ── Propagation ───────────────────────────────────────────────────────

    /// Apply the propagation rule to every lane.  Returns `true` if any car
    /// moved or settled.
    pub fn move_cars_on_road(&self, status: &mut [CarStatus], cars: &[Car]) -> bool {
        let mut changed = false;
        for lane in &self.lanes {
            changed |= self.move_lane(lane, status, cars);
        }
        changed
    }

    fn move_lane(&self, lane: &VecDeque<CarIdx>, status: &mut [CarStatus], cars: &[Car]) -> bool {
        let mut changed = false;
        let mut ahead: Option<(u32, CarState)> = None;
        for &car in lane {
            let st = &mut status[car.index()];
            if st.state == CarState::Waiting {
                let v = cars[car.index()].speed_on(self.top_speed);
                match ahead {
                    None if st.pos + v <= self.length => {
                        st.pos += v;
                        st.state = CarState::OnRoad;
                        changed = true;
                    }
                    None => {}
                    Some((ahead_pos, ahead_state)) => {
                        let gap = ahead_pos - st.pos - 1;
                        if v <= gap {
                            st.pos += v;
                            st.state = CarState::OnRoad;
                            changed = true;
                        } else if ahead_state == CarState::OnRoad {
                            st.pos = ahead_pos - 1;
                            st.state = CarState::OnRoad;
                            changed = true;
                        }
                    }
                }
            }
            ahead = Some((st.pos, st.state));
        }
        changed
    }

    // ── Crossing support ──────────────────────────────────────────────────

    /// The waiting lane-front car with the highest priority: furthest along,
    /// then lowest lane.  Returns `(lane, car)`.
    pub fn head(&self, status: &[CarStatus]) -> Option<(u32, CarIdx)> {
        let mut best: Option<(u32, u32, CarIdx)> = None;
        for (i, lane) in self.lanes.iter().enumerate() {
            let Some(&car) = lane.front() else { continue };
            let st = &status[car.index()];
            if st.state != CarState::Waiting {
                continue;
            }
            if best.is_none_or(|(pos, _, _)| st.pos > pos) {
                best = Some((st.pos, i as u32, car));
            }
        }
        best.map(|(_, lane, car)| (lane, car))
    }

    /// Where a car that can travel `reach` cells onto this track would land.
    /// Lanes are tried in ascending order.
    pub fn entry_for(&self, reach: u32, status: &[CarStatus]) -> Entry {
        for (i, lane) in self.lanes.iter().enumerate() {
            let Some(&back) = lane.back() else {
                return Entry::At { lane: i as u32, pos: reach.min(self.length) };
            };
            let st = &status[back.index()];
            if st.pos > reach {
                return Entry::At { lane: i as u32, pos: reach };
            }
            if st.state == CarState::Waiting {
                return Entry::Blocked;
            }
            if st.pos > 1 {
                return Entry::At { lane: i as u32, pos: st.pos - 1 };
            }
        }
        Entry::Full
    }

    /// Append `car` to the back of `lane` at `pos`, settled.
    pub fn insert(&mut self, car: CarIdx, lane: u32, pos: u32, status: &mut [CarStatus]) {
        self.lanes[lane as usize].push_back(car);
        self.count += 1;
        let st = &mut status[car.index()];
        st.state = CarState::OnRoad;
        st.edge = self.edge;
        st.lane = lane;
        st.pos = pos;
    }

    /// Remove the front car of `lane`.
    pub fn pop_front(&mut self, lane: u32) -> Option<CarIdx> {
        let car = self.lanes[lane as usize].pop_front()?;
        self.count -= 1;
        Some(car)
    }

    /// Place a car released from the garage.  Returns `false` if the track
    /// has no room for it this tick.
    pub fn put_car_on_road(&mut self, car: CarIdx, status: &mut [CarStatus], cars: &[Car]) -> bool {
        let reach = cars[car.index()].speed_on(self.top_speed);
        match self.entry_for(reach, status) {
            Entry::At { lane, pos } => {
                self.insert(car, lane, pos, status);
                true
            }
            Entry::Blocked | Entry::Full => false,
        }
    }
}
