//! Simulation observer trait for progress reporting.

use td_core::{CarId, Tick};

use crate::scheduler::TickReport;

/// Callbacks invoked by [`Scheduler::step_with`][crate::Scheduler::step_with]
/// and the run-to-completion helpers.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.
///
/// # Example: progress printer
///
/// ```rust,ignore
/// struct ProgressPrinter { interval: u64 }
///
/// impl SimObserver for ProgressPrinter {
///     fn on_tick_end(&mut self, report: &TickReport) {
///         if report.tick.0 % self.interval == 0 {
///             println!("{}: {} on road", report.tick, report.on_road);
///         }
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called at the start of each tick, before any car moves.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called for each car that left the network during a completed tick,
    /// in the order the cars arrived.
    fn on_arrival(&mut self, _car: CarId, _tick: Tick) {}

    /// Called after the garage release of a tick that completed.
    fn on_tick_end(&mut self, _report: &TickReport) {}

    /// Called when a tick ends with cars still waiting on each other.
    fn on_deadlock(&mut self, _tick: Tick, _waiting: usize) {}

    /// Called once when every dispatched car has arrived.
    fn on_finish(&mut self, _completion: Tick) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
