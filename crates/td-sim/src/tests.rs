//! Unit tests for td-sim.
//!
//! Networks are built by hand; expected ticks follow from the movement rules
//! in `road` and `crossroad`.

#[cfg(test)]
pub(crate) mod helpers {
    use std::sync::Arc;

    use td_core::{Car, CarId, CrossId, RoadId, SimConfig, Tick};
    use td_network::{Cross, Road, RoadNetwork, RoadNetworkBuilder};

    use crate::{Scheduler, SchedulerBuilder};

    pub fn road(id: u32, start: u32, end: u32, length: u32, top_speed: u32, lanes: u32) -> Road {
        Road {
            id: RoadId(id),
            start: CrossId(start),
            end: CrossId(end),
            length,
            top_speed,
            lanes,
            bidirectional: false,
        }
    }

    pub fn cross(id: u32, s: [u32; 4]) -> Cross {
        Cross::new(CrossId(id), s.map(|r| (r > 0).then_some(RoadId(r))))
    }

    pub fn car(id: u32, from: u32, to: u32, plan: u64) -> Car {
        Car::new(CarId(id), CrossId(from), CrossId(to), Tick(plan))
    }

    /// `1 ──12──▶ 2 ──23──▶ 3`, one-way, straight through cross 2.
    pub fn line_network(length: u32, top_speed: u32, lanes: u32) -> Arc<RoadNetwork> {
        line_network_with(length, length, top_speed, lanes)
    }

    pub fn line_network_with(first: u32, second: u32, top_speed: u32, lanes: u32) -> Arc<RoadNetwork> {
        let mut b = RoadNetworkBuilder::new();
        b.add_road(road(12, 1, 2, first, top_speed, lanes))
            .add_road(road(23, 2, 3, second, top_speed, lanes));
        b.add_cross(cross(1, [0, 12, 0, 0]))
            .add_cross(cross(2, [0, 23, 0, 12]))
            .add_cross(cross(3, [0, 0, 0, 23]));
        Arc::new(b.build().unwrap())
    }

    pub fn scheduler(network: Arc<RoadNetwork>, cars: Vec<Car>) -> Scheduler {
        SchedulerBuilder::new(network, cars).build().unwrap()
    }

    pub fn scheduler_with(network: Arc<RoadNetwork>, cars: Vec<Car>, config: SimConfig) -> Scheduler {
        SchedulerBuilder::new(network, cars).config(config).build().unwrap()
    }
}

// ── Road propagation ───────────────────────────────────────────────────────────

#[cfg(test)]
mod road {
    use td_core::{CarIdx, EdgeId};

    use super::helpers::{car, road};
    use crate::{CarState, CarStatus, Entry, Track};

    fn setup(n: usize) -> (Track, Vec<CarStatus>, Vec<td_core::Car>) {
        let track = Track::new(EdgeId(0), &road(1, 1, 2, 10, 3, 2));
        let cars = (0..n as u32).map(|i| car(i + 1, 1, 2, 0)).collect();
        (track, vec![CarStatus::default(); n], cars)
    }

    #[test]
    fn free_car_advances_by_speed() {
        let (mut track, mut status, cars) = setup(1);
        track.insert(CarIdx(0), 0, 2, &mut status);
        status[0].state = CarState::Waiting;
        assert!(track.move_cars_on_road(&mut status, &cars));
        assert_eq!(status[0].pos, 5);
        assert_eq!(status[0].state, CarState::OnRoad);
    }

    #[test]
    fn front_car_past_end_keeps_waiting() {
        let (mut track, mut status, cars) = setup(2);
        track.insert(CarIdx(0), 0, 9, &mut status);
        track.insert(CarIdx(1), 0, 7, &mut status);
        status[0].state = CarState::Waiting;
        status[1].state = CarState::Waiting;

        assert!(!track.move_cars_on_road(&mut status, &cars));
        assert_eq!(status[0].state, CarState::Waiting);
        // Gap of one behind a waiting car: stays waiting too.
        assert_eq!(status[1].state, CarState::Waiting);

        // Once the front car settles at the stop line, the follower closes up.
        status[0].pos = 10;
        status[0].state = CarState::OnRoad;
        assert!(track.move_cars_on_road(&mut status, &cars));
        assert_eq!(status[1].pos, 9);
        assert_eq!(status[1].state, CarState::OnRoad);
    }

    #[test]
    fn head_prefers_position_then_lane() {
        let (mut track, mut status, _) = setup(2);
        track.insert(CarIdx(0), 0, 8, &mut status);
        track.insert(CarIdx(1), 1, 9, &mut status);
        assert_eq!(track.head(&status), None, "settled cars are not offered");

        status[0].state = CarState::Waiting;
        status[1].state = CarState::Waiting;
        assert_eq!(track.head(&status), Some((1, CarIdx(1))));

        status[1].pos = 8;
        assert_eq!(track.head(&status), Some((0, CarIdx(0))));
    }

    #[test]
    fn entry_slots() {
        let (mut track, mut status, _) = setup(3);
        assert_eq!(track.entry_for(4, &status), Entry::At { lane: 0, pos: 4 });
        assert_eq!(track.entry_for(40, &status), Entry::At { lane: 0, pos: 10 });

        track.insert(CarIdx(0), 0, 3, &mut status);
        assert_eq!(track.entry_for(2, &status), Entry::At { lane: 0, pos: 2 });
        assert_eq!(track.entry_for(5, &status), Entry::At { lane: 0, pos: 2 });

        status[0].state = CarState::Waiting;
        assert_eq!(track.entry_for(5, &status), Entry::Blocked);

        status[0].state = CarState::OnRoad;
        status[0].pos = 1;
        assert_eq!(track.entry_for(5, &status), Entry::At { lane: 1, pos: 5 });

        track.insert(CarIdx(1), 1, 1, &mut status);
        assert_eq!(track.entry_for(5, &status), Entry::Full);
    }

    #[test]
    fn load_is_occupied_fraction() {
        let (mut track, mut status, _) = setup(2);
        assert_eq!(track.capacity(), 20);
        assert_eq!(track.calculate_load(), 0.0);
        track.insert(CarIdx(0), 0, 5, &mut status);
        track.insert(CarIdx(1), 1, 5, &mut status);
        assert!((track.calculate_load() - 0.1).abs() < 1e-12);
        assert_eq!(track.pop_front(0), Some(CarIdx(0)));
        assert_eq!(track.car_count(), 1);
    }
}

// ── Crossroad rules ────────────────────────────────────────────────────────────

#[cfg(test)]
mod crossroad {
    use std::sync::Arc;

    use td_core::{CarId, RightOfWayRule, RoadId, SimConfig, Tick};
    use td_network::RoadNetworkBuilder;

    use super::helpers::{car, cross, road, scheduler_with};
    use crate::{Movement, RightOfWay, RoadOrder, SchedulerBuilder, StraightFirst, Turn};

    #[test]
    fn turns_from_slots() {
        assert_eq!(Turn::between(0, 2), Turn::Straight);
        assert_eq!(Turn::between(3, 1), Turn::Straight);
        assert_eq!(Turn::between(0, 1), Turn::Left);
        assert_eq!(Turn::between(3, 2), Turn::Right);
        assert_eq!(Turn::between(2, 2), Turn::UTurn);
    }

    #[test]
    fn straight_first_yields_only_on_shared_target() {
        use td_core::EdgeId;
        let turn = Movement { from_road: RoadId(1), target: Some(EdgeId(7)), turn: Turn::Left };
        let straight_same = Movement { from_road: RoadId(2), target: Some(EdgeId(7)), turn: Turn::Straight };
        let straight_other = Movement { from_road: RoadId(3), target: Some(EdgeId(8)), turn: Turn::Straight };

        assert!(StraightFirst.must_yield(&turn, &[straight_other, straight_same]));
        assert!(!StraightFirst.must_yield(&turn, &[straight_other]));
        assert!(!StraightFirst.must_yield(&straight_same, &[turn]));
        assert!(!RoadOrder.must_yield(&turn, &[straight_same]));
    }

    /// Two cars reach cross 5 together, both heading into road 53 which
    /// holds one car.  Car 1 comes straight down road 52 from the north;
    /// car 2 turns right off road 51 from the west.
    ///
    /// ```text
    ///            1
    ///            │52
    ///   2 ──51── 5
    ///            │53
    ///            3
    /// ```
    fn merge_winner(rule: RightOfWayRule) -> CarId {
        let mut b = RoadNetworkBuilder::new();
        b.add_road(road(51, 2, 5, 1, 1, 1))
            .add_road(road(52, 1, 5, 1, 1, 1))
            .add_road(road(53, 5, 3, 1, 1, 1));
        b.add_cross(cross(1, [0, 0, 52, 0]))
            .add_cross(cross(2, [0, 51, 0, 0]))
            .add_cross(cross(3, [53, 0, 0, 0]))
            .add_cross(cross(5, [52, 0, 53, 51]));
        let network = Arc::new(b.build().unwrap());

        let config = SimConfig { right_of_way: rule, ..SimConfig::default() };
        let mut s = scheduler_with(network, vec![car(1, 1, 3, 0), car(2, 2, 3, 0)], config);
        s.dispatch_roads(CarId(1), Tick(0), &[RoadId(52), RoadId(53)]).unwrap();
        s.dispatch_roads(CarId(2), Tick(0), &[RoadId(51), RoadId(53)]).unwrap();
        s.step().unwrap(); // release
        s.step().unwrap(); // both at the stop line of cross 5

        let on_target: Vec<CarId> = s
            .cars()
            .iter()
            .enumerate()
            .filter(|(i, _)| s.status(td_core::CarIdx(*i as u32)).hop == 1)
            .map(|(_, c)| c.id)
            .collect();
        assert_eq!(on_target.len(), 1, "target road holds a single car");
        on_target[0]
    }

    #[test]
    fn straight_movement_wins_merge() {
        assert_eq!(merge_winner(RightOfWayRule::StraightFirst), CarId(1));
    }

    #[test]
    fn road_order_serves_lowest_road_first() {
        assert_eq!(merge_winner(RightOfWayRule::RoadOrder), CarId(2));
    }

    #[test]
    fn injected_policy_overrides_config() {
        let network = super::helpers::line_network(2, 1, 1);
        let s = SchedulerBuilder::new(network, vec![])
            .config(SimConfig { right_of_way: RightOfWayRule::StraightFirst, ..SimConfig::default() })
            .right_of_way(Box::new(RoadOrder))
            .build()
            .unwrap();
        assert_eq!(s.crossroads().len(), 3);
    }
}

// ── Tick engine ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scheduler {
    use std::sync::Arc;

    use td_core::{CarId, CarIdx, CrossId, RoadId, SimConfig, Tick};
    use td_network::{NetworkError, RoadNetworkBuilder};

    use super::helpers::{car, cross, line_network, line_network_with, road, scheduler, scheduler_with};
    use crate::{CarState, SchedulerBuilder, SimError, SimObserver, TickReport};

    #[test]
    fn slow_car_crosses_line() {
        let mut s = scheduler(line_network(5, 1, 1), vec![car(1, 1, 3, 0)]);
        s.dispatch_roads(CarId(1), Tick(0), &[RoadId(12), RoadId(23)]).unwrap();
        assert_eq!(s.step_until_finish().unwrap(), Tick(10));

        let st = s.status(CarIdx(0));
        assert_eq!(st.state, CarState::OffRoad);
        assert_eq!(st.departed, Some(Tick(0)));
        assert_eq!(s.arrival(CarIdx(0)), Some(Tick(10)));
        assert_eq!(s.total_travel_ticks(), 10);
        assert_eq!(s.on_road_count(), 0);
    }

    #[test]
    fn fast_car_takes_one_tick_per_road() {
        let mut s = scheduler(line_network(5, 5, 1), vec![car(1, 1, 3, 0)]);
        s.dispatch_roads(CarId(1), Tick(0), &[RoadId(12), RoadId(23)]).unwrap();
        assert_eq!(s.step_until_finish().unwrap(), Tick(2));
    }

    #[test]
    fn car_speed_caps_road_speed() {
        let cars = vec![car(1, 1, 3, 0).with_speed(1)];
        let mut s = scheduler(line_network(5, 5, 1), cars);
        s.dispatch_roads(CarId(1), Tick(0), &[RoadId(12), RoadId(23)]).unwrap();
        assert_eq!(s.step_until_finish().unwrap(), Tick(10));
    }

    #[test]
    fn late_start_is_held_in_garage() {
        let mut s = scheduler(line_network(5, 5, 1), vec![car(1, 1, 3, 0)]);
        s.dispatch_roads(CarId(1), Tick(3), &[RoadId(12), RoadId(23)]).unwrap();
        for _ in 0..3 {
            let report = s.step().unwrap();
            assert_eq!(report.released, 0);
            assert_eq!(report.in_garage, 1);
        }
        assert_eq!(s.step().unwrap().released, 1);
        assert_eq!(s.step_until_finish().unwrap(), Tick(5));
    }

    #[test]
    fn full_single_lane_road_holds_second_car() {
        let network = line_network_with(1, 5, 1, 1);
        let mut s = scheduler(network, vec![car(1, 1, 3, 0), car(2, 1, 3, 0)]);
        s.dispatch_roads(CarId(1), Tick(0), &[RoadId(12), RoadId(23)]).unwrap();
        s.dispatch_roads(CarId(2), Tick(0), &[RoadId(12), RoadId(23)]).unwrap();

        let first = s.step().unwrap();
        assert_eq!(first.released, 1);
        assert_eq!(first.in_garage, 1);
        assert_eq!(s.status(CarIdx(1)).state, CarState::InGarage);
        let edge = s.network().links_of(RoadId(12)).unwrap()[0].unwrap();
        assert_eq!(s.track(edge).car_count(), 1);

        let second = s.step().unwrap();
        assert_eq!(second.released, 1);
        assert!(s.garage().is_empty());
        assert_eq!(s.step_until_finish().unwrap(), Tick(7));
    }

    #[test]
    fn empty_route_arrives_on_release() {
        let mut s = scheduler(line_network(5, 1, 1), vec![car(1, 2, 2, 0)]);
        s.dispatch_roads(CarId(1), Tick(0), &[]).unwrap();
        let report = s.step().unwrap();
        assert_eq!(report.released, 1);
        assert_eq!(report.arrived, 1);
        assert!(s.is_finished());
        assert_eq!(s.completion_tick(), Some(Tick(0)));
    }

    /// Two one-way roads between crosses 1 and 2 form a loop; each car sits
    /// on one road wanting the other.
    #[test]
    fn cyclic_wait_reports_deadlock() {
        let mut b = RoadNetworkBuilder::new();
        b.add_road(road(1, 1, 2, 1, 1, 1)).add_road(road(2, 2, 1, 1, 1, 1));
        b.add_cross(cross(1, [0, 1, 2, 0])).add_cross(cross(2, [0, 0, 2, 1]));
        let network = Arc::new(b.build().unwrap());

        let mut s = scheduler(network, vec![car(1, 1, 2, 0), car(2, 2, 1, 0)]);
        s.dispatch_roads(CarId(1), Tick(0), &[RoadId(1), RoadId(2), RoadId(1)]).unwrap();
        s.dispatch_roads(CarId(2), Tick(0), &[RoadId(2), RoadId(1), RoadId(2)]).unwrap();
        assert_eq!(s.step().unwrap().released, 2);

        let err = s.step().unwrap_err();
        assert!(matches!(err, SimError::Deadlock { tick: Tick(1), waiting: 2 }), "{err}");
        assert!(err.is_deadlock());
        assert_eq!(s.now(), Tick(1), "clock does not advance on deadlock");
        assert!(s.step_until_finish().unwrap_err().is_deadlock());
    }

    #[test]
    fn tick_limit_stops_run() {
        let config = SimConfig { max_ticks: 3, ..SimConfig::default() };
        let mut s = scheduler_with(line_network(5, 1, 1), vec![car(1, 1, 3, 0)], config);
        s.dispatch_roads(CarId(1), Tick(0), &[RoadId(12), RoadId(23)]).unwrap();
        let err = s.step_until_finish().unwrap_err();
        assert!(matches!(err, SimError::TickLimit { limit: 3 }));
    }

    #[test]
    fn release_cap_limits_admissions_per_tick() {
        let cars = (1..=5).map(|i| car(i, 1, 3, 0)).collect();
        let config = SimConfig { release_cap: Some(2), ..SimConfig::default() };
        let mut s = scheduler_with(line_network(10, 2, 3), cars, config);
        for i in 1..=5 {
            s.dispatch_roads(CarId(i), Tick(0), &[RoadId(12), RoadId(23)]).unwrap();
        }
        assert_eq!(s.step().unwrap().released, 2);
        assert_eq!(s.step().unwrap().released, 2);
        assert_eq!(s.step().unwrap().released, 1);
        s.set_release_cap(None);
        assert!(s.step_until_finish().is_ok());
    }

    #[test]
    fn dispatch_validation() {
        let mut s = scheduler(line_network(5, 1, 1), vec![car(1, 1, 3, 0)]);
        assert!(matches!(
            s.dispatch_roads(CarId(9), Tick(0), &[]),
            Err(SimError::UnknownCar(CarId(9)))
        ));
        assert!(matches!(
            s.dispatch_roads(CarId(1), Tick(0), &[RoadId(12)]),
            Err(SimError::Network(NetworkError::InvalidRoute { .. }))
        ));
        s.dispatch_roads(CarId(1), Tick(0), &[RoadId(12), RoadId(23)]).unwrap();
        assert!(matches!(
            s.dispatch_roads(CarId(1), Tick(0), &[RoadId(12), RoadId(23)]),
            Err(SimError::AlreadyDispatched(CarId(1)))
        ));
        assert_eq!(s.dispatches().count(), 1);
    }

    #[test]
    fn builder_validates_cars() {
        let dup = SchedulerBuilder::new(line_network(5, 1, 1), vec![car(1, 1, 3, 0), car(1, 1, 2, 0)]).build();
        assert!(matches!(dup, Err(SimError::Config(_))));

        let stray = SchedulerBuilder::new(line_network(5, 1, 1), vec![car(1, 1, 9, 0)]).build();
        assert!(matches!(stray, Err(SimError::Network(NetworkError::UnknownCross(CrossId(9))))));
    }

    #[test]
    fn peak_load_recorded() {
        let mut s = scheduler(line_network(5, 1, 1), vec![car(1, 1, 3, 0)]);
        s.dispatch_roads(CarId(1), Tick(0), &[RoadId(12), RoadId(23)]).unwrap();
        s.step_until_finish().unwrap();
        let edge = s.network().links_of(RoadId(12)).unwrap()[0].unwrap();
        assert!((s.peak_load(edge) - 0.2).abs() < 1e-12);
        let peaks = s.road_peak_loads();
        assert_eq!(peaks.len(), 2);
        assert!(peaks.iter().all(|&(_, p)| p > 0.0));
    }

    #[derive(Default)]
    struct Counter {
        ticks: usize,
        arrived: usize,
        arrivals: Vec<CarId>,
        finished: Option<Tick>,
    }

    impl SimObserver for Counter {
        fn on_arrival(&mut self, car: CarId, _tick: Tick) {
            self.arrivals.push(car);
        }
        fn on_tick_end(&mut self, report: &TickReport) {
            self.ticks += 1;
            self.arrived += report.arrived;
        }
        fn on_finish(&mut self, completion: Tick) {
            self.finished = Some(completion);
        }
    }

    #[test]
    fn observer_sees_every_tick() {
        let mut s = scheduler(line_network(5, 5, 1), vec![car(1, 1, 3, 0), car(2, 1, 3, 1)]);
        s.dispatch_roads(CarId(1), Tick(0), &[RoadId(12), RoadId(23)]).unwrap();
        s.dispatch_roads(CarId(2), Tick(1), &[RoadId(12), RoadId(23)]).unwrap();
        let mut obs = Counter::default();
        let done = s.step_until_finish_with(&mut obs).unwrap();
        assert_eq!(done, Tick(3));
        assert_eq!(obs.ticks, 4);
        assert_eq!(obs.arrived, 2);
        assert_eq!(obs.arrivals, vec![CarId(1), CarId(2)]);
        assert_eq!(obs.finished, Some(done));
    }
}

// ── Snapshots ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod snapshot {
    use td_core::{CarId, RoadId, Tick};

    use super::helpers::{car, line_network, scheduler};
    use crate::{Scheduler, SimError, TickReport};

    fn loaded() -> Scheduler {
        let cars = (1..=6).map(|i| car(i, 1, 3, (i / 2) as u64)).collect();
        let mut s = scheduler(line_network(4, 2, 2), cars);
        for i in 1..=6 {
            s.dispatch_roads(CarId(i), Tick((i / 2) as u64), &[RoadId(12), RoadId(23)]).unwrap();
        }
        s
    }

    fn run(s: &mut Scheduler, n: usize) -> Vec<TickReport> {
        (0..n).map(|_| s.step().unwrap()).collect()
    }

    #[test]
    fn restore_reproduces_state_and_replay() {
        let mut s = loaded();
        run(&mut s, 2);
        let saved_at = s.save_scheduler_state();
        assert_eq!(saved_at, Tick(2));
        let before = s.snapshot();

        let first = run(&mut s, 3);
        assert_ne!(s.snapshot(), before);

        s.restore_scheduler_state(saved_at).unwrap();
        assert_eq!(s.snapshot(), before);
        assert_eq!(s.now(), Tick(2));
        assert_eq!(run(&mut s, 3), first);
    }

    #[test]
    fn snapshot_by_value() {
        let mut s = loaded();
        let snap = s.snapshot();
        assert_eq!(snap.tick(), Tick(0));
        assert_eq!(snap.in_garage(), 6);
        s.step_until_finish().unwrap();
        s.restore(snap.clone());
        assert_eq!(s.snapshot(), snap);
        assert_eq!(s.garage().len(), 6);
    }

    #[test]
    fn missing_and_discarded_snapshots() {
        let mut s = loaded();
        assert!(matches!(s.restore_scheduler_state(Tick(4)), Err(SimError::NoSnapshot(Tick(4)))));
        s.save_scheduler_state();
        s.step().unwrap();
        s.save_scheduler_state();
        assert_eq!(s.snapshot_count(), 2);
        s.discard_snapshots_before(Tick(1));
        assert_eq!(s.snapshot_count(), 1);
        assert!(s.restore_scheduler_state(Tick(0)).is_err());
        assert!(s.restore_scheduler_state(Tick(1)).is_ok());
    }
}

// ── Randomised invariants ──────────────────────────────────────────────────────

#[cfg(test)]
mod invariants {
    use std::sync::Arc;

    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use td_core::{CarIdx, CrossId, RoadId, SimConfig, WeightStrategy};
    use td_network::{Cross, Road, RoadGraph, RoadNetwork, RoadNetworkBuilder};

    use super::helpers::car;
    use crate::{CarState, Scheduler, SchedulerBuilder, SimError};

    const SIDE: u32 = 3;

    /// A `SIDE`×`SIDE` grid of crosses with random two-way roads.
    fn grid(rng: &mut SmallRng) -> Arc<RoadNetwork> {
        let id = |r: u32, c: u32| r * SIDE + c + 1;
        let mut slots = vec![[None; 4]; (SIDE * SIDE) as usize];
        let mut b = RoadNetworkBuilder::new();
        let mut next = 100;
        let mut add = |b: &mut RoadNetworkBuilder, from: u32, to: u32, from_slot: usize, to_slot: usize| {
            let road = Road {
                id: RoadId(next),
                start: CrossId(from),
                end: CrossId(to),
                length: rng.gen_range(2..8),
                top_speed: rng.gen_range(1..4),
                lanes: rng.gen_range(1..3),
                bidirectional: true,
            };
            slots[(from - 1) as usize][from_slot] = Some(road.id);
            slots[(to - 1) as usize][to_slot] = Some(road.id);
            b.add_road(road);
            next += 1;
        };
        for r in 0..SIDE {
            for c in 0..SIDE {
                if c + 1 < SIDE {
                    add(&mut b, id(r, c), id(r, c + 1), 1, 3);
                }
                if r + 1 < SIDE {
                    add(&mut b, id(r, c), id(r + 1, c), 2, 0);
                }
            }
        }
        for (i, s) in slots.into_iter().enumerate() {
            b.add_cross(Cross::new(CrossId(i as u32 + 1), s));
        }
        Arc::new(b.build().unwrap())
    }

    fn check(s: &Scheduler) {
        for track in s.tracks() {
            assert!(track.car_count() <= track.capacity());
            let load = track.calculate_load();
            assert!((0.0..=1.0).contains(&load));
            for lane in 0..track.lane_count() {
                let mut ahead = track.length + 1;
                for car in track.lane(lane) {
                    let st = s.status(car);
                    assert!(st.pos >= 1 && st.pos < ahead, "lane order broken");
                    assert_eq!(st.state, CarState::OnRoad);
                    ahead = st.pos;
                }
            }
        }
    }

    #[test]
    fn random_grids_keep_invariants() {
        for seed in 0..8u64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let network = grid(&mut rng);
            let cross_count = SIDE * SIDE;
            let cars: Vec<_> = (1..=40)
                .map(|i| {
                    let from = rng.gen_range(1..=cross_count);
                    let mut to = rng.gen_range(1..=cross_count);
                    if to == from {
                        to = from % cross_count + 1;
                    }
                    car(i, from, to, rng.gen_range(0..6))
                })
                .collect();

            let config = SimConfig { release_cap: Some(3), max_ticks: 5_000, ..SimConfig::default() };
            let mut s = SchedulerBuilder::new(network.clone(), cars.clone())
                .config(config)
                .build()
                .unwrap();
            let graph = RoadGraph::new(network.clone(), WeightStrategy::Length);
            for c in &cars {
                let route = graph.shortest_path(c.from, c.to).unwrap();
                let idx = s.car_idx(c.id).unwrap();
                s.dispatch(idx, c.plan_time, route.edges).unwrap();
            }
            for (id, idx, d) in s.dispatches() {
                let c = s.car(idx);
                assert_eq!(c.id, id);
                let (from, to) = (network.node(c.from).unwrap(), network.node(c.to).unwrap());
                assert!(network.is_contiguous(from, to, &d.route));
            }

            let outcome = loop {
                if s.is_finished() {
                    break Ok(());
                }
                match s.step() {
                    Ok(report) => {
                        assert!(report.released <= 3);
                        check(&s);
                    }
                    Err(e) => break Err(e),
                }
            };
            match outcome {
                Ok(()) => {
                    for i in 0..cars.len() {
                        let st = s.status(CarIdx(i as u32));
                        assert_eq!(st.state, CarState::OffRoad);
                        assert!(st.arrived.unwrap() >= st.departed.unwrap());
                    }
                }
                Err(e) => assert!(matches!(e, SimError::Deadlock { .. }), "seed {seed}: {e}"),
            }
        }
    }
}

// ── Answer files ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod answer {
    use std::io::Cursor;

    use td_core::{CarId, CoreError, RoadId, Tick};

    use super::helpers::{car, line_network, scheduler};
    use crate::{read_answers_file, read_answers_reader, write_answers, write_answers_file, AnswerRecord};

    #[test]
    fn padding_and_comments_skipped() {
        let text = "#(carId,StartTime,RoadId...)\n(1001, 3, 501, 502, 0, -1)\n\n1002,4\n";
        let answers = read_answers_reader(Cursor::new(text)).unwrap();
        assert_eq!(
            answers,
            vec![
                AnswerRecord { car: CarId(1001), start: Tick(3), roads: vec![RoadId(501), RoadId(502)] },
                AnswerRecord { car: CarId(1002), start: Tick(4), roads: vec![] },
            ]
        );
    }

    #[test]
    fn short_record_rejected() {
        let err = read_answers_reader(Cursor::new("# header\n(1001)\n")).unwrap_err();
        assert!(matches!(err, CoreError::Parse { line: 2, .. }));
    }

    #[test]
    fn written_file_reads_back() {
        let answers = vec![
            AnswerRecord { car: CarId(1), start: Tick(0), roads: vec![RoadId(12), RoadId(23)] },
            AnswerRecord { car: CarId(2), start: Tick(5), roads: vec![RoadId(12)] },
        ];
        let mut buf = Vec::new();
        write_answers(&mut buf, &answers).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("(1, 0, 12, 23)"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answer.txt");
        write_answers_file(&path, &answers).unwrap();
        assert_eq!(read_answers_file(&path).unwrap(), answers);
    }

    #[test]
    fn replay_from_answers() {
        let answers = read_answers_reader(Cursor::new("(1, 0, 12, 23)\n(2, 1, 12, 23)\n")).unwrap();
        let mut s = scheduler(line_network(5, 5, 1), vec![car(1, 1, 3, 0), car(2, 1, 3, 0)]);
        for a in &answers {
            s.update_car_from_answer(a).unwrap();
        }
        assert_eq!(s.step_until_finish().unwrap(), Tick(3));
    }
}
