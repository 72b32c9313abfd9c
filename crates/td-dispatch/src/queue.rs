//! Release priority queue.
//!
//! Cars wait here until the dispatcher admits them.  Two min-heaps keep
//! preset and ordinary cars apart so that, within a tick, every eligible
//! preset car is offered before any ordinary one.  Inside each heap the
//! order is ascending effective plan tick, then ascending car id.
//!
//! The queue is `Clone` so the adaptive dispatcher can roll it back together
//! with the scheduler.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use td_core::{Car, CarId, CarIdx, Tick};

/// A car waiting for admission.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pending {
    pub car: CarIdx,
    pub id: CarId,
    /// Plan tick, pushed back by one for every deferral.
    pub effective: Tick,
    pub preset: bool,
    pub deferrals: u32,
}

impl Pending {
    pub fn new(car: CarIdx, c: &Car) -> Self {
        Self { car, id: c.id, effective: c.plan_time, preset: c.preset, deferrals: 0 }
    }

    /// The same car, retried one tick after `now`.
    pub fn deferred(self, now: Tick) -> Self {
        Self {
            effective: self.effective.max(now) + 1,
            deferrals: self.deferrals + 1,
            ..self
        }
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.effective
            .cmp(&other.effective)
            .then(self.id.cmp(&other.id))
            .then(self.deferrals.cmp(&other.deferrals))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReleaseQueue {
    preset:   BinaryHeap<Reverse<Pending>>,
    ordinary: BinaryHeap<Reverse<Pending>>,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the given members of `cars` (indices into the id-sorted car
    /// list).
    pub fn from_cars(cars: &[Car], members: &[CarIdx]) -> Self {
        let mut queue = Self::new();
        for &car in members {
            queue.push(Pending::new(car, &cars[car.index()]));
        }
        queue
    }

    pub fn push(&mut self, pending: Pending) {
        if pending.preset {
            self.preset.push(Reverse(pending));
        } else {
            self.ordinary.push(Reverse(pending));
        }
    }

    pub fn len(&self) -> usize {
        self.preset.len() + self.ordinary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preset.is_empty() && self.ordinary.is_empty()
    }

    /// Remove and return the highest-priority car eligible at `now`.
    pub fn pop_eligible(&mut self, now: Tick) -> Option<Pending> {
        for heap in [&mut self.preset, &mut self.ordinary] {
            if heap.peek().is_some_and(|Reverse(p)| p.effective <= now) {
                return heap.pop().map(|Reverse(p)| p);
            }
        }
        None
    }

    /// Earliest effective tick of any queued car.
    pub fn next_tick(&self) -> Option<Tick> {
        let a = self.preset.peek().map(|Reverse(p)| p.effective);
        let b = self.ordinary.peek().map(|Reverse(p)| p.effective);
        match (a, b) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
