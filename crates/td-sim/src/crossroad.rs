//! Crossroad arbitration: moving waiting cars from incoming roads onto their
//! next road or off the network.
//!
//! Each crossroad serves its incoming edges in ascending road id.  For the
//! current edge it repeatedly takes the highest-priority waiting car (see
//! [`Track::head`]) and tries to cross it.  A car that cannot cross blocks
//! every car behind it on the same edge for the rest of this pass; the
//! scheduler repeats passes until no crossroad changes state.

use td_core::{Car, CarIdx, CrossId, EdgeId, NodeId, RightOfWayRule, RoadId, Tick};
use td_network::RoadNetwork;

use crate::road::Entry;
use crate::state::{CarState, SimState};

// ── Turns and movements ───────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Turn {
    Straight,
    Left,
    Right,
    UTurn,
}

impl Turn {
    /// Turn taken when entering through slot `from` and leaving through slot
    /// `to` (slots clockwise from north).
    pub fn between(from: usize, to: usize) -> Turn {
        match (to + 4 - from % 4) % 4 {
            2 => Turn::Straight,
            1 => Turn::Left,
            3 => Turn::Right,
            _ => Turn::UTurn,
        }
    }
}

/// What a waiting head car intends to do at a crossroad.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Movement {
    pub from_road: RoadId,
    /// Next edge, or `None` when the car leaves the network here.
    pub target: Option<EdgeId>,
    pub turn: Turn,
}

// ── Right of way ──────────────────────────────────────────────────────────────

/// Decides whether a head car must give way to the heads of the other
/// incoming roads.
pub trait RightOfWay: Send + Sync {
    fn must_yield(&self, candidate: &Movement, competing: &[Movement]) -> bool;
}

/// Roads are served in id order with no yielding.
pub struct RoadOrder;

impl RightOfWay for RoadOrder {
    fn must_yield(&self, _candidate: &Movement, _competing: &[Movement]) -> bool {
        false
    }
}

/// A turning car yields to any straight movement into the same road.
pub struct StraightFirst;

impl RightOfWay for StraightFirst {
    fn must_yield(&self, candidate: &Movement, competing: &[Movement]) -> bool {
        if candidate.turn == Turn::Straight || candidate.target.is_none() {
            return false;
        }
        competing
            .iter()
            .any(|m| m.turn == Turn::Straight && m.target == candidate.target)
    }
}

/// The built-in policy for a configured rule.
pub fn right_of_way(rule: RightOfWayRule) -> Box<dyn RightOfWay> {
    match rule {
        RightOfWayRule::RoadOrder => Box::new(RoadOrder),
        RightOfWayRule::StraightFirst => Box::new(StraightFirst),
    }
}

// ── Crossing a single car ─────────────────────────────────────────────────────

/// Immutable context shared by every crossroad during a tick.
pub(crate) struct Env<'a> {
    pub network: &'a RoadNetwork,
    pub cars: &'a [Car],
    pub policy: &'a dyn RightOfWay,
    pub now: Tick,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Crossing {
    /// Left the network at its destination.
    Exited,
    /// Entered the next edge.
    Crossed,
    /// Could not enter the next edge; moved to the stop line and settled.
    Stopped,
    /// The next edge's entry is held by a car that has not moved yet.
    Blocked,
}

fn cross_car(env: &Env<'_>, state: &mut SimState, edge: EdgeId, lane: u32, car: CarIdx) -> Crossing {
    let st = &state.status[car.index()];
    let pos = st.pos;
    let Some(next) = st.next_edge() else {
        state.tracks[edge.index()].pop_front(lane);
        let st = &mut state.status[car.index()];
        st.state = CarState::OffRoad;
        st.edge = EdgeId::INVALID;
        st.arrived = Some(env.now);
        state.on_road -= 1;
        state.arrived += 1;
        state.tick_arrivals.push(car);
        return Crossing::Exited;
    };

    let length = state.tracks[edge.index()].length;
    let remaining = length - pos;
    let target = &state.tracks[next.index()];
    let v2 = env.cars[car.index()].speed_on(target.top_speed);

    let entry = if v2 <= remaining {
        Entry::Full
    } else {
        target.entry_for(v2 - remaining, &state.status)
    };
    match entry {
        Entry::Blocked => Crossing::Blocked,
        Entry::Full => {
            let st = &mut state.status[car.index()];
            st.pos = length;
            st.state = CarState::OnRoad;
            Crossing::Stopped
        }
        Entry::At { lane: to_lane, pos: to_pos } => {
            state.tracks[edge.index()].pop_front(lane);
            state.tracks[next.index()].insert(car, to_lane, to_pos, &mut state.status);
            state.status[car.index()].hop += 1;
            Crossing::Crossed
        }
    }
}

// ── Crossroad ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Crossroad {
    pub node: NodeId,
    pub id: CrossId,
    /// Incoming edges, ascending road id.
    incoming: Vec<EdgeId>,
    changed: bool,
}

impl Crossroad {
    pub fn new(node: NodeId, network: &RoadNetwork) -> Self {
        Self {
            node,
            id: network.cross(node).id,
            incoming: network.incoming(node).to_vec(),
            changed: false,
        }
    }

    pub fn incoming(&self) -> &[EdgeId] {
        &self.incoming
    }

    /// `true` if the last [`schedule`](Self::schedule) pass moved any car.
    pub fn is_state_changed(&self) -> bool {
        self.changed
    }

    /// One arbitration pass over every incoming edge.
    pub(crate) fn schedule(&mut self, env: &Env<'_>, state: &mut SimState) -> bool {
        self.changed = false;
        for &edge in &self.incoming {
            while let Some((lane, car)) = state.tracks[edge.index()].head(&state.status) {
                let candidate = self.movement(env, state, edge, car);
                let competing: Vec<Movement> = self
                    .incoming
                    .iter()
                    .filter(|&&other| other != edge)
                    .filter_map(|&other| {
                        let (_, head) = state.tracks[other.index()].head(&state.status)?;
                        Some(self.movement(env, state, other, head))
                    })
                    .collect();
                if env.policy.must_yield(&candidate, &competing) {
                    break;
                }
                if cross_car(env, state, edge, lane, car) == Crossing::Blocked {
                    break;
                }
                self.changed = true;
                state.tracks[edge.index()].move_cars_on_road(&mut state.status, env.cars);
            }
        }
        self.changed
    }

    fn movement(&self, env: &Env<'_>, state: &SimState, edge: EdgeId, car: CarIdx) -> Movement {
        let from_road = env.network.link(edge).road_id;
        let Some(target) = state.status[car.index()].next_edge() else {
            return Movement { from_road, target: None, turn: Turn::Straight };
        };
        let cross = env.network.cross(self.node);
        let to_road = env.network.link(target).road_id;
        let turn = match (cross.slot_of(from_road), cross.slot_of(to_road)) {
            (Some(a), Some(b)) => Turn::between(a, b),
            _ => Turn::Straight,
        };
        Movement { from_road, target: Some(target), turn }
    }
}
