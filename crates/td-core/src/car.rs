//! The `Car` entity: immutable trip data read from the input file.
//!
//! Runtime state (position, lifecycle state, assigned route) lives in
//! `td-sim`; the dispatcher assigns start ticks and routes.  `Car` itself
//! never changes after load.


use crate::{CarId, CrossId, Tick};

/// One vehicle of the dispatch problem.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Car {
    pub id: CarId,
    /// Origin crossroad.
    pub from: CrossId,
    /// Destination crossroad.
    pub to: CrossId,
    /// Earliest tick at which the car may be released.
    pub plan_time: Tick,
    /// Preset cars are released ahead of ordinary ones and never deferred.
    pub preset: bool,
    /// Car's own speed limit in cells per tick.  `None` means the car is
    /// bounded only by road top speeds.
    pub max_speed: Option<u32>,
}

impl Car {
    pub fn new(id: CarId, from: CrossId, to: CrossId, plan_time: Tick) -> Self {
        Self { id, from, to, plan_time, preset: false, max_speed: None }
    }

    pub fn with_speed(mut self, max_speed: u32) -> Self {
        self.max_speed = Some(max_speed);
        self
    }

    pub fn preset(mut self) -> Self {
        self.preset = true;
        self
    }

    /// Cells per tick this car covers on a road with the given top speed.
    #[inline]
    pub fn speed_on(&self, top_speed: u32) -> u32 {
        match self.max_speed {
            Some(v) => v.min(top_speed),
            None => top_speed,
        }
    }
}
