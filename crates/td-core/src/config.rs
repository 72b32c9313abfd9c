//! Run configuration for the scheduler and the dispatcher.
//!
//! Every type implements `Default` with the values the contest dispatcher was
//! tuned with.  With the `serde` feature the whole tree can be loaded from a
//! JSON file by the application crate; missing fields fall back to defaults.

use crate::{CoreError, CoreResult};

// ── Routing ───────────────────────────────────────────────────────────────────

/// How `RoadGraph` weighs a directed road traversal.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WeightStrategy {
    /// Static road length.
    #[default]
    Length,
    /// Free-flow travel time: length / top speed.
    TravelTime,
    /// Travel time scaled by `1 + alpha * load`, recomputed between ticks.
    LoadAdjusted { alpha: f64 },
}

/// Which compass axes feed the direction accumulator used to split cars into
/// two cohorts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Directionality {
    /// No split: every car goes to the first cohort.
    None,
    NorthSouth,
    EastWest,
    #[default]
    Both,
}

/// Pre-scheduling weight calibration.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Calibration {
    None,
    /// Keep the weight of the least used roads (by route count in a trial
    /// plan, up to half of all roads) and multiply every other road,
    /// unused ones included, by `factor`.
    Usage { factor: f64 },
    /// Multiply the weight of every road whose peak load during a trial run
    /// exceeded `threshold` by `factor`.
    Load { threshold: f64, factor: f64 },
}

impl Calibration {
    pub const USAGE_FACTOR: f64 = 1.5;

    /// Mild load calibration: threshold 0.5, factor 2.0.
    pub fn mild_load() -> Self {
        Calibration::Load { threshold: 0.5, factor: 2.0 }
    }

    /// Aggressive load calibration: threshold 0.9, factor 6.5.
    pub fn aggressive_load() -> Self {
        Calibration::Load { threshold: 0.9, factor: 6.5 }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration::mild_load()
    }
}

// ── Simulation ────────────────────────────────────────────────────────────────

/// Right-of-way rule applied by every crossroad.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RightOfWayRule {
    /// Incoming roads are served strictly in ascending road id.
    RoadOrder,
    /// Turning movements yield to a straight movement into the same road.
    #[default]
    StraightFirst,
}

/// Scheduler (tick engine) configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Hard bound on the tick counter; `step` fails past it.
    pub max_ticks: u64,
    /// Maximum garage releases per tick.  `None` releases every car whose
    /// start tick has come and whose first road has room.
    pub release_cap: Option<usize>,
    pub right_of_way: RightOfWayRule,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_ticks:    100_000,
            release_cap:  None,
            right_of_way: RightOfWayRule::default(),
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// Router / admission controller configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DispatchConfig {
    /// Maximum cars released per tick.
    pub flow_limit: usize,
    /// Floor for the adaptive flow limit.
    pub min_flow_limit: usize,
    /// Multiplier applied to the flow limit after a deadlock (adaptive mode).
    pub flow_shrink: f64,
    /// Roll back and retry with a lower flow limit on deadlock instead of
    /// failing the run.
    pub adaptive: bool,
    /// A car whose route touches an edge loaded above this ratio is deferred.
    pub congestion_threshold: f64,
    /// Deferrals allowed per car before it is released regardless of load.
    pub max_deferrals: u32,
    pub weighting: WeightStrategy,
    pub directionality: Directionality,
    /// Extra ticks simulated between two cohorts.
    pub cohort_gap: u64,
    pub calibration: Calibration,
    /// Number of calibrate-then-reweight rounds before the committed run.
    pub calibration_passes: usize,
    pub sim: SimConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            flow_limit:           26,
            min_flow_limit:       1,
            flow_shrink:          0.8,
            adaptive:             false,
            congestion_threshold: 0.9,
            max_deferrals:        16,
            weighting:            WeightStrategy::default(),
            directionality:       Directionality::default(),
            cohort_gap:           2,
            calibration:          Calibration::default(),
            calibration_passes:   1,
            sim:                  SimConfig::default(),
        }
    }
}

impl DispatchConfig {
    /// Reject values the dispatcher cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.flow_limit == 0 {
            return Err(CoreError::Config("flow_limit must be at least 1".into()));
        }
        if self.min_flow_limit == 0 || self.min_flow_limit > self.flow_limit {
            return Err(CoreError::Config(format!(
                "min_flow_limit must be in 1..={}, got {}",
                self.flow_limit, self.min_flow_limit
            )));
        }
        if !(0.0..1.0).contains(&self.flow_shrink) {
            return Err(CoreError::Config(format!(
                "flow_shrink must be in [0, 1), got {}",
                self.flow_shrink
            )));
        }
        if !(0.0..=1.0).contains(&self.congestion_threshold) {
            return Err(CoreError::Config(format!(
                "congestion_threshold must be a ratio in [0, 1], got {}",
                self.congestion_threshold
            )));
        }
        match self.calibration {
            Calibration::Usage { factor } | Calibration::Load { factor, .. } if factor <= 0.0 => {
                Err(CoreError::Config(format!("calibration factor must be positive, got {factor}")))
            }
            _ => Ok(()),
        }
    }
}
