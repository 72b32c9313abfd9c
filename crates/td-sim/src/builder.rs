//! Fluent builder for constructing a [`Scheduler`].

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use td_core::{Car, CarIdx, EdgeId, NodeId, SimClock, SimConfig, Tick};
use td_network::RoadNetwork;

use crate::crossroad::{right_of_way, Crossroad, RightOfWay};
use crate::garage::Garage;
use crate::road::Track;
use crate::state::{CarStatus, SimState};
use crate::{Scheduler, SimError, SimResult};

/// Fluent builder for [`Scheduler`].
///
/// # Optional inputs (have defaults)
///
/// | Method              | Default                                   |
/// |---------------------|-------------------------------------------|
/// | `.config(c)`        | `SimConfig::default()`                    |
/// | `.right_of_way(p)`  | the policy named by `config.right_of_way` |
///
/// # Example
///
/// ```rust,ignore
/// let mut scheduler = SchedulerBuilder::new(network, cars)
///     .config(SimConfig::default())
///     .build()?;
/// for answer in read_answers_file(&path)? {
///     scheduler.update_car_from_answer(&answer)?;
/// }
/// let done = scheduler.step_until_finish()?;
/// ```
pub struct SchedulerBuilder {
    network: Arc<RoadNetwork>,
    cars:    Vec<Car>,
    config:  SimConfig,
    policy:  Option<Box<dyn RightOfWay>>,
}

impl SchedulerBuilder {
    pub fn new(network: Arc<RoadNetwork>, cars: Vec<Car>) -> Self {
        Self {
            network,
            cars,
            config: SimConfig::default(),
            policy: None,
        }
    }

    pub fn config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Inject a custom right-of-way policy, overriding `config.right_of_way`.
    pub fn right_of_way(mut self, policy: Box<dyn RightOfWay>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Validate the car set and build the scheduler.
    ///
    /// # Errors
    ///
    /// - [`SimError::Config`] if two cars share an id.
    /// - [`SimError::Network`] if a car's origin or destination is not a
    ///   cross of the network.
    pub fn build(self) -> SimResult<Scheduler> {
        let mut cars = self.cars;
        cars.sort_unstable_by_key(|c| c.id);

        let mut car_index = FxHashMap::default();
        car_index.reserve(cars.len());
        for (i, car) in cars.iter().enumerate() {
            self.network.node(car.from)?;
            self.network.node(car.to)?;
            if car_index.insert(car.id, CarIdx(i as u32)).is_some() {
                return Err(SimError::Config(format!("duplicate car id {}", car.id)));
            }
        }

        let network = self.network;
        let tracks: Vec<Track> = (0..network.edge_count())
            .map(|e| {
                let edge = EdgeId(e as u32);
                Track::new(edge, network.road_of(edge))
            })
            .collect();
        let crossroads = (0..network.cross_count())
            .map(|n| Crossroad::new(NodeId(n as u32), &network))
            .collect();

        let state = SimState {
            clock:         SimClock::new(Tick::ZERO),
            peak_load:     vec![0.0; tracks.len()],
            tracks,
            status:        vec![CarStatus::default(); cars.len()],
            garage:        Garage::default(),
            on_road:       0,
            arrived:       0,
            tick_arrivals: Vec::new(),
        };

        let policy = self.policy.unwrap_or_else(|| right_of_way(self.config.right_of_way));
        log::debug!(
            "scheduler ready: {} cars, {} tracks, {} crossroads",
            cars.len(),
            state.tracks.len(),
            network.cross_count()
        );

        Ok(Scheduler {
            config: self.config,
            network,
            cars,
            car_index,
            crossroads,
            policy,
            state,
            snapshots: BTreeMap::new(),
        })
    }
}
