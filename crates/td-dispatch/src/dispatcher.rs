//! The router / admission controller.
//!
//! # Admission loop
//!
//! ```text
//! every tick:
//!   queue empty → load the next cohort (after cohort_gap idle ticks if an
//!                 earlier cohort had cars); none left and all arrived → done
//!   (adaptive) cars eligible → checkpoint scheduler + cohort cursor
//!   pop eligible cars (presets first) while released < flow limit:
//!     route = shortest path under current weights
//!     congested and deferrable → push back one tick
//!     otherwise               → dispatch at now
//!   step the scheduler
//!     deadlock, checkpoint, above floor → restore, shrink limit, go on
//!     deadlock otherwise                → run failed
//! ```
//!
//! A deadlock usually shows up a few ticks after the admissions that caused
//! it, so the rollback target is the latest admission checkpoint rather than
//! the tick that failed.
//!
//! The scheduler's release cap follows the flow limit, so no more than
//! `flow_limit` cars ever leave the garage in one tick.

use std::collections::BTreeMap;
use std::sync::Arc;

use td_core::{Car, CarId, DispatchConfig, RoadId, SimConfig, Tick, WeightStrategy};
use td_network::{RoadGraph, RoadNetwork};
use td_sim::{AnswerRecord, Scheduler, SchedulerBuilder, SimError};

use crate::cohort::partition;
use crate::queue::ReleaseQueue;
use crate::DispatchResult;

// ── Plan & report ─────────────────────────────────────────────────────────────

/// Start tick and road sequence assigned to one car.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanEntry {
    /// Tick the car left the garage, or its admission tick if it never did.
    pub start: Tick,
    pub roads: Vec<RoadId>,
}

/// The dispatch plan, keyed by car id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    entries: BTreeMap<CarId, PlanEntry>,
}

impl Plan {
    /// Collect every dispatch currently held by `scheduler`.
    ///
    /// A car held back in the garage by the release cap or a full entry
    /// road is recorded at the tick it actually departed, so replaying the
    /// plan without a cap reproduces the run.
    pub fn from_scheduler(scheduler: &Scheduler) -> Self {
        let network = scheduler.network();
        let entries = scheduler
            .dispatches()
            .map(|(id, car, d)| {
                let start = scheduler.status(car).departed.unwrap_or(d.start);
                (id, PlanEntry { start, roads: network.route_roads(&d.route) })
            })
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, car: CarId, entry: PlanEntry) {
        self.entries.insert(car, entry);
    }

    pub fn get(&self, car: CarId) -> Option<&PlanEntry> {
        self.entries.get(&car)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending car id.
    pub fn iter(&self) -> impl Iterator<Item = (CarId, &PlanEntry)> + '_ {
        self.entries.iter().map(|(&id, e)| (id, e))
    }

    pub fn to_answers(&self) -> Vec<AnswerRecord> {
        self.iter()
            .map(|(car, e)| AnswerRecord { car, start: e.start, roads: e.roads.clone() })
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct DispatchReport {
    pub plan: Plan,
    /// Latest arrival tick; `None` if the run ended in deadlock.
    pub completion: Option<Tick>,
    /// Sum over arrived cars of arrival minus plan time.
    pub total_travel: u64,
    pub final_flow_limit: usize,
    pub deferrals: usize,
    pub rollbacks: usize,
}

impl DispatchReport {
    /// Completion tick as printed by the tools; `-1` on deadlock.
    pub fn completion_ticks(&self) -> i64 {
        self.completion.map_or(-1, |t| t.0 as i64)
    }

    pub fn is_success(&self) -> bool {
        self.completion.is_some()
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RunMode {
    /// Deferral and adaptive rollback as configured.
    Committed,
    /// Plain flow cap only; used for calibration.
    Trial,
}

/// Position in the cohort sequence.  Cloned into checkpoints.
#[derive(Clone, Debug, Default)]
struct Cursor {
    queue: ReleaseQueue,
    /// Index of the next cohort to load.
    next_cohort: usize,
    /// Idle ticks left before the loaded cohort starts admitting.
    gap: u64,
    /// Some cohort has already been admitted.
    started: bool,
}

/// Mutable bookkeeping of one run.
struct RunState {
    cursor: Cursor,
    /// Scheduler tick and cursor saved before the latest admission.
    checkpoint: Option<(Tick, Cursor)>,
    limit: usize,
    deferrals: usize,
    rollbacks: usize,
}

pub struct Dispatcher {
    graph:  RoadGraph,
    /// Cars in ascending id order; positions match the scheduler's `CarIdx`.
    cars:   Vec<Car>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(network: Arc<RoadNetwork>, mut cars: Vec<Car>, config: DispatchConfig) -> DispatchResult<Self> {
        config.validate()?;
        cars.sort_unstable_by_key(|c| c.id);
        let graph = RoadGraph::new(network, config.weighting);
        Ok(Self { graph, cars, config })
    }

    pub fn network(&self) -> &Arc<RoadNetwork> {
        self.graph.network()
    }

    pub fn graph(&self) -> &RoadGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut RoadGraph {
        &mut self.graph
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Road ids of `car`'s shortest route under the current weights.
    pub fn shortest_route(&self, car: &Car) -> DispatchResult<Vec<RoadId>> {
        let route = self.graph.shortest_path(car.from, car.to)?;
        Ok(route.roads(self.graph.network()))
    }

    /// Calibrate for the configured number of passes, then run the
    /// committed schedule.
    pub fn run(&mut self) -> DispatchResult<DispatchReport> {
        for pass in 0..self.config.calibration_passes {
            let roads = self.calibrate()?;
            log::debug!("calibration pass {}: {} roads penalised", pass + 1, roads.len());
        }
        self.schedule()
    }

    /// One committed run under the current weights.
    pub fn schedule(&mut self) -> DispatchResult<DispatchReport> {
        let (report, _) = self.simulate(RunMode::Committed)?;
        match report.completion {
            Some(t) => log::info!(
                "dispatched {} cars, completion {t}, total travel {}, flow limit {}",
                report.plan.len(),
                report.total_travel,
                report.final_flow_limit
            ),
            None => log::warn!(
                "dispatch deadlocked with flow limit {} after {} rollbacks",
                report.final_flow_limit,
                report.rollbacks
            ),
        }
        Ok(report)
    }

    pub(crate) fn simulate(&mut self, mode: RunMode) -> DispatchResult<(DispatchReport, Scheduler)> {
        let sim_config = SimConfig {
            release_cap: Some(self.config.flow_limit),
            ..self.config.sim.clone()
        };
        let mut scheduler = SchedulerBuilder::new(self.graph.network().clone(), self.cars.clone())
            .config(sim_config)
            .build()?;
        if matches!(self.config.weighting, WeightStrategy::LoadAdjusted { .. }) {
            self.graph.refresh_loads(&scheduler);
        }

        let cohorts = partition(&self.graph, &self.cars, self.config.directionality)?;
        let adaptive = mode == RunMode::Committed && self.config.adaptive;
        let mut run = RunState {
            cursor: Cursor::default(),
            checkpoint: None,
            limit: self.config.flow_limit,
            deferrals: 0,
            rollbacks: 0,
        };

        let completion = loop {
            let cursor = &mut run.cursor;
            if cursor.queue.is_empty() && cursor.gap == 0 {
                if let Some(cohort) = cohorts.get(cursor.next_cohort) {
                    cursor.next_cohort += 1;
                    cursor.queue = ReleaseQueue::from_cars(&self.cars, cohort);
                    if !cohort.is_empty() {
                        if cursor.started {
                            cursor.gap = self.config.cohort_gap;
                        }
                        cursor.started = true;
                    }
                    continue;
                }
                if scheduler.is_finished() {
                    break Some(scheduler.completion_tick().unwrap_or(Tick::ZERO));
                }
            }

            let now = scheduler.now();
            let admitting = cursor.gap == 0 && cursor.queue.next_tick().is_some_and(|t| t <= now);
            if adaptive && admitting {
                let at = scheduler.save_scheduler_state();
                scheduler.discard_snapshots_before(at);
                run.checkpoint = Some((at, run.cursor.clone()));
            }
            if run.cursor.gap > 0 {
                run.cursor.gap -= 1;
            } else {
                self.admit(&mut scheduler, &mut run, mode)?;
            }

            match scheduler.step() {
                Ok(_) => {}
                Err(SimError::Deadlock { tick, waiting }) => {
                    let retry = run.checkpoint.clone().filter(|_| run.limit > self.config.min_flow_limit);
                    let Some((at, cursor)) = retry else {
                        log::debug!("deadlock at {tick}: {waiting} cars waiting, flow limit {}", run.limit);
                        break None;
                    };
                    scheduler.restore_scheduler_state(at)?;
                    run.cursor = cursor;
                    run.limit = shrink(run.limit, self.config.flow_shrink, self.config.min_flow_limit);
                    run.rollbacks += 1;
                    scheduler.set_release_cap(Some(run.limit));
                    log::debug!("deadlock at {tick}: rolled back to {at}, flow limit now {}", run.limit);
                }
                Err(e) => return Err(e.into()),
            }
        };

        let report = DispatchReport {
            plan: Plan::from_scheduler(&scheduler),
            completion,
            total_travel: scheduler.total_travel_ticks(),
            final_flow_limit: run.limit,
            deferrals: run.deferrals,
            rollbacks: run.rollbacks,
        };
        Ok((report, scheduler))
    }

    /// Dispatch eligible cars at the scheduler's current tick.
    fn admit(&mut self, scheduler: &mut Scheduler, run: &mut RunState, mode: RunMode) -> DispatchResult<()> {
        let now = scheduler.now();
        if matches!(self.config.weighting, WeightStrategy::LoadAdjusted { .. }) {
            self.graph.refresh_loads(&*scheduler);
        }
        let defer = mode == RunMode::Committed;

        let mut released = 0;
        let mut deferred = Vec::new();
        while released < run.limit {
            let Some(pending) = run.cursor.queue.pop_eligible(now) else { break };
            let car = &self.cars[pending.car.index()];
            let route = self.graph.shortest_path(car.from, car.to)?;
            if defer
                && !pending.preset
                && pending.deferrals < self.config.max_deferrals
                && self.graph.is_congested(&route, &*scheduler, self.config.congestion_threshold)
            {
                deferred.push(pending.deferred(now));
                continue;
            }
            scheduler.dispatch(pending.car, now, route.edges)?;
            released += 1;
        }
        run.deferrals += deferred.len();
        for pending in deferred {
            run.cursor.queue.push(pending);
        }
        Ok(())
    }
}

/// Next flow limit after a deadlock: scaled by `factor`, at least one lower,
/// never below `floor`.
pub fn shrink(limit: usize, factor: f64, floor: usize) -> usize {
    let scaled = (limit as f64 * factor).floor() as usize;
    scaled.min(limit.saturating_sub(1)).max(floor)
}
