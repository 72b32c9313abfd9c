//! The `Scheduler` and its tick loop.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use td_core::{Car, CarId, CarIdx, EdgeId, RoadId, SimConfig, Tick};
use td_network::{LoadSource, NetworkError, RoadNetwork};

use crate::answer::AnswerRecord;
use crate::crossroad::{Crossroad, Env, RightOfWay};
use crate::garage::Garage;
use crate::road::Track;
use crate::snapshot::SimulationSnapshot;
use crate::state::{CarState, CarStatus, Dispatch, SimState};
use crate::{NoopObserver, SimError, SimObserver, SimResult};

/// Outcome of one completed tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TickReport {
    pub tick: Tick,
    /// Cars that left the garage this tick.
    pub released: usize,
    /// Cars that left the network this tick.
    pub arrived: usize,
    pub on_road: usize,
    pub in_garage: usize,
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// The tick engine.
///
/// Each [`step`](Self::step) processes the current tick in three phases and
/// then advances the clock:
///
/// 1. **Road propagation**: every track (ascending edge) moves its cars
///    without crossing, repeated until a full sweep changes nothing.
/// 2. **Crossing**: every crossroad (ascending cross id) runs one
///    arbitration pass, followed by a road propagation sweep; repeated until
///    no crossroad changes state.  Cars still waiting afterwards are in a
///    cyclic wait and the tick fails with [`SimError::Deadlock`].
/// 3. **Garage release**: dispatched cars whose start tick has come enter
///    their first road in ascending id order.
///
/// Create via [`SchedulerBuilder`][crate::SchedulerBuilder].
pub struct Scheduler {
    pub(crate) config:     SimConfig,
    pub(crate) network:    Arc<RoadNetwork>,
    /// Cars in ascending id order, indexed by `CarIdx`.
    pub(crate) cars:       Vec<Car>,
    pub(crate) car_index:  FxHashMap<CarId, CarIdx>,
    pub(crate) crossroads: Vec<Crossroad>,
    pub(crate) policy:     Box<dyn RightOfWay>,
    pub(crate) state:      SimState,
    pub(crate) snapshots:  BTreeMap<Tick, SimulationSnapshot>,
}

impl Scheduler {
    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn now(&self) -> Tick {
        self.state.clock.now()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn network(&self) -> &Arc<RoadNetwork> {
        &self.network
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn car_idx(&self, id: CarId) -> SimResult<CarIdx> {
        self.car_index.get(&id).copied().ok_or(SimError::UnknownCar(id))
    }

    pub fn car(&self, car: CarIdx) -> &Car {
        &self.cars[car.index()]
    }

    pub fn status(&self, car: CarIdx) -> &CarStatus {
        self.state.car(car)
    }

    pub fn track(&self, edge: EdgeId) -> &Track {
        &self.state.tracks[edge.index()]
    }

    pub fn tracks(&self) -> &[Track] {
        &self.state.tracks
    }

    pub fn crossroads(&self) -> &[Crossroad] {
        &self.crossroads
    }

    pub fn garage(&self) -> &Garage {
        &self.state.garage
    }

    pub fn on_road_count(&self) -> usize {
        self.state.on_road
    }

    pub fn arrived_count(&self) -> usize {
        self.state.arrived
    }

    /// Change the per-tick garage release cap.
    pub fn set_release_cap(&mut self, cap: Option<usize>) {
        self.config.release_cap = cap;
    }

    // ── Dispatch ──────────────────────────────────────────────────────────

    /// Park `car` in the garage with a start tick and a route of edges.
    ///
    /// The route must be a contiguous chain from the car's origin to its
    /// destination; an empty route is only valid if they coincide.
    pub fn dispatch(&mut self, car: CarIdx, start: Tick, route: Vec<EdgeId>) -> SimResult<()> {
        let c = &self.cars[car.index()];
        if self.state.status[car.index()].dispatch.is_some() {
            return Err(SimError::AlreadyDispatched(c.id));
        }
        let from = self.network.node(c.from)?;
        let to = self.network.node(c.to)?;
        if !self.network.is_contiguous(from, to, &route) {
            return Err(NetworkError::InvalidRoute {
                from:   c.from,
                to:     c.to,
                reason: "edges do not form a chain between the endpoints".into(),
            }
            .into());
        }
        let st = &mut self.state.status[car.index()];
        st.dispatch = Some(Dispatch { start, route });
        st.state = CarState::InGarage;
        self.state.garage.insert(car);
        Ok(())
    }

    /// [`dispatch`](Self::dispatch) by external ids.
    pub fn dispatch_roads(&mut self, id: CarId, start: Tick, roads: &[RoadId]) -> SimResult<()> {
        let car = self.car_idx(id)?;
        let c = &self.cars[car.index()];
        let route = self.network.resolve_route(c.from, c.to, roads)?;
        self.dispatch(car, start, route)
    }

    /// Apply one answer record.
    pub fn update_car_from_answer(&mut self, answer: &AnswerRecord) -> SimResult<()> {
        self.dispatch_roads(answer.car, answer.start, &answer.roads)
    }

    /// Every dispatched car with its start tick and route, ascending id.
    pub fn dispatches(&self) -> impl Iterator<Item = (CarId, CarIdx, &Dispatch)> + '_ {
        self.cars
            .iter()
            .zip(&self.state.status)
            .enumerate()
            .filter_map(|(i, (car, st))| st.dispatch.as_ref().map(|d| (car.id, CarIdx(i as u32), d)))
    }

    // ── Tick loop ─────────────────────────────────────────────────────────

    pub fn step(&mut self) -> SimResult<TickReport> {
        self.step_with(&mut NoopObserver)
    }

    /// Process the current tick and advance the clock.
    ///
    /// On deadlock the clock is not advanced and the partially processed
    /// tick is left in place; restore a snapshot to retry.
    pub fn step_with<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<TickReport> {
        let now = self.state.clock.now();
        if now.0 >= self.config.max_ticks {
            return Err(SimError::TickLimit { limit: self.config.max_ticks });
        }
        observer.on_tick_start(now);

        let env = Env {
            network: &self.network,
            cars:    &self.cars,
            policy:  &*self.policy,
            now,
        };
        let state = &mut self.state;
        state.begin_tick();

        // ── Phase 1: road propagation ─────────────────────────────────────
        propagate(state, env.cars);

        // ── Phase 2: crossing ─────────────────────────────────────────────
        loop {
            let mut changed = false;
            for crossroad in self.crossroads.iter_mut() {
                changed |= crossroad.schedule(&env, state);
            }
            if !changed {
                break;
            }
            propagate(state, env.cars);
        }

        let waiting = state.waiting_count();
        if waiting > 0 {
            log::debug!("deadlock at {now}: {waiting} cars waiting, {} on road", state.on_road);
            observer.on_deadlock(now, waiting);
            return Err(SimError::Deadlock { tick: now, waiting });
        }

        // ── Phase 3: garage release ───────────────────────────────────────
        let released = state.garage.release(
            now,
            self.config.release_cap,
            &mut state.tracks,
            &mut state.status,
            env.cars,
            &mut state.tick_arrivals,
        );
        let left_at_once = released
            .iter()
            .filter(|c| state.status[c.index()].state == CarState::OffRoad)
            .count();
        state.on_road += released.len() - left_at_once;
        state.arrived += left_at_once;

        state.record_loads();
        state.clock.advance();

        let report = TickReport {
            tick:      now,
            released:  released.len(),
            arrived:   state.tick_arrivals.len(),
            on_road:   state.on_road,
            in_garage: state.garage.len(),
        };
        log::trace!(
            "{now}: released {} arrived {} on road {} garage {}",
            report.released,
            report.arrived,
            report.on_road,
            report.in_garage
        );
        for car in &state.tick_arrivals {
            observer.on_arrival(self.cars[car.index()].id, now);
        }
        observer.on_tick_end(&report);
        Ok(report)
    }

    /// `true` once no car is parked or on the network.
    pub fn is_finished(&self) -> bool {
        self.state.garage.is_empty() && self.state.on_road == 0
    }

    /// Step until every dispatched car has arrived.  Returns the completion
    /// tick.
    pub fn step_until_finish(&mut self) -> SimResult<Tick> {
        self.step_until_finish_with(&mut NoopObserver)
    }

    pub fn step_until_finish_with<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<Tick> {
        while !self.is_finished() {
            self.step_with(observer)?;
        }
        let completion = self.completion_tick().unwrap_or(Tick::ZERO);
        log::debug!(
            "finished at {completion}: {} cars arrived, total travel {}",
            self.state.arrived,
            self.total_travel_ticks()
        );
        observer.on_finish(completion);
        Ok(completion)
    }

    // ── Statistics ────────────────────────────────────────────────────────

    /// Latest arrival tick over all cars.
    pub fn completion_tick(&self) -> Option<Tick> {
        self.state.status.iter().filter_map(|s| s.arrived).max()
    }

    pub fn arrival(&self, car: CarIdx) -> Option<Tick> {
        self.state.status[car.index()].arrived
    }

    /// Sum over arrived cars of arrival tick minus plan time.
    pub fn total_travel_ticks(&self) -> u64 {
        self.cars
            .iter()
            .zip(&self.state.status)
            .filter_map(|(car, st)| st.arrived.map(|t| t.since(car.plan_time)))
            .sum()
    }

    /// Highest load `edge` showed at any tick boundary so far.
    pub fn peak_load(&self, edge: EdgeId) -> f64 {
        self.state.peak_load[edge.index()]
    }

    /// Peak load per road, the higher of its two directions.
    pub fn road_peak_loads(&self) -> Vec<(RoadId, f64)> {
        let mut by_road: BTreeMap<RoadId, f64> = BTreeMap::new();
        for (i, link) in self.network.links.iter().enumerate() {
            let peak = by_road.entry(link.road_id).or_insert(0.0);
            *peak = peak.max(self.state.peak_load[i]);
        }
        by_road.into_iter().collect()
    }

    // ── Snapshots ─────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot { state: self.state.clone() }
    }

    pub fn restore(&mut self, snapshot: SimulationSnapshot) {
        self.state = snapshot.state;
    }

    /// Save a snapshot keyed by the current tick and return that tick.
    pub fn save_scheduler_state(&mut self) -> Tick {
        let now = self.now();
        self.snapshots.insert(now, self.snapshot());
        now
    }

    /// Restore the snapshot saved at `tick`.  The snapshot stays stored so
    /// the same tick can be retried again.
    pub fn restore_scheduler_state(&mut self, tick: Tick) -> SimResult<()> {
        let snapshot = self.snapshots.get(&tick).cloned().ok_or(SimError::NoSnapshot(tick))?;
        self.restore(snapshot);
        Ok(())
    }

    pub fn discard_snapshots_before(&mut self, tick: Tick) {
        self.snapshots = self.snapshots.split_off(&tick);
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }
}

impl LoadSource for Scheduler {
    fn load(&self, edge: EdgeId) -> f64 {
        self.state.tracks[edge.index()].calculate_load()
    }
}

/// Sweep every track until nothing moves.
fn propagate(state: &mut SimState, cars: &[Car]) {
    loop {
        let mut changed = false;
        for track in &state.tracks {
            changed |= track.move_cars_on_road(&mut state.status, cars);
        }
        if !changed {
            break;
        }
    }
}
