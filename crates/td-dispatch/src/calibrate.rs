//! Pre-scheduling weight calibration.
//!
//! A trial run (plain flow cap, no deferral, no rollback) shows which roads
//! the current weights overload.  Those roads get their weight multiplied so
//! the committed run spreads traffic away from them.

use rustc_hash::{FxHashMap, FxHashSet};

use td_core::{Calibration, RoadId};

use crate::dispatcher::{Dispatcher, RunMode};
use crate::{DispatchResult, Plan};

/// Number of planned routes through each road.
pub fn road_usage(plan: &Plan) -> FxHashMap<RoadId, usize> {
    let mut usage = FxHashMap::default();
    for (_, entry) in plan.iter() {
        for &road in &entry.roads {
            *usage.entry(road).or_insert(0) += 1;
        }
    }
    usage
}

/// Roads to penalise, ascending id, and the factor to apply.
///
/// - `Usage`: every road of `roads` outside the light set.  The light set
///   is the `roads.len() / 2` least used roads among those with any usage,
///   ties broken by lower id.
/// - `Load`: every road whose peak load exceeded the threshold.
pub fn select_roads(
    calibration: Calibration,
    roads:       &[RoadId],
    usage:       &FxHashMap<RoadId, usize>,
    peak_loads:  &[(RoadId, f64)],
) -> (Vec<RoadId>, f64) {
    let (mut selected, factor) = match calibration {
        Calibration::None => (Vec::new(), 1.0),
        Calibration::Usage { factor } => {
            let mut used: Vec<(RoadId, usize)> = usage.iter().map(|(&r, &n)| (r, n)).collect();
            used.sort_unstable_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
            let light: FxHashSet<RoadId> = used.iter().take(roads.len() / 2).map(|&(r, _)| r).collect();
            (roads.iter().copied().filter(|r| !light.contains(r)).collect(), factor)
        }
        Calibration::Load { threshold, factor } => {
            let hot = peak_loads
                .iter()
                .filter(|&&(_, peak)| peak > threshold)
                .map(|&(r, _)| r)
                .collect();
            (hot, factor)
        }
    };
    selected.sort_unstable();
    selected.dedup();
    (selected, factor)
}

impl Dispatcher {
    /// Run one trial and penalise the roads it overloaded.  Returns the
    /// penalised roads.
    pub fn calibrate(&mut self) -> DispatchResult<Vec<RoadId>> {
        if self.config().calibration == Calibration::None {
            return Ok(Vec::new());
        }
        let (report, scheduler) = self.simulate(RunMode::Trial)?;
        let usage = road_usage(&report.plan);
        let all: Vec<RoadId> = self.network().roads.iter().map(|r| r.id).collect();
        let (roads, factor) =
            select_roads(self.config().calibration, &all, &usage, &scheduler.road_peak_loads());
        for &road in &roads {
            self.graph_mut().penalize_road(road, factor)?;
        }
        log::info!(
            "calibration: trial completion {}, penalised {} roads by {factor}",
            report.completion_ticks(),
            roads.len()
        );
        Ok(roads)
    }
}
