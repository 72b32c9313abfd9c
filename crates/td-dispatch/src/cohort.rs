//! Direction cohorts.
//!
//! Cars are split into two cohorts by the net compass direction of their
//! planned route so that opposing flows are admitted at different times.
//! Every edge contributes its road length, signed by the compass slot it
//! leaves its source cross through:
//!
//! | Slot  | Axis        | Sign |
//! |-------|-------------|------|
//! | North | north-south | `+`  |
//! | South | north-south | `-`  |
//! | East  | east-west   | `+`  |
//! | West  | east-west   | `-`  |
//!
//! Only the axes named by the [`Directionality`] count.  A total `<= 0`
//! puts the car in cohort A, anything else in cohort B.

use td_core::{Car, CarIdx, Directionality, EdgeId};
use td_network::{Compass, RoadGraph, RoadNetwork};

use crate::DispatchResult;

/// Signed direction accumulator of a route.
pub fn direction_score(network: &RoadNetwork, route: &[EdgeId], directionality: Directionality) -> i64 {
    let (ns, ew) = match directionality {
        Directionality::None => return 0,
        Directionality::NorthSouth => (true, false),
        Directionality::EastWest => (false, true),
        Directionality::Both => (true, true),
    };
    route
        .iter()
        .map(|&edge| {
            let len = i64::from(network.road_of(edge).length);
            match network.compass(edge) {
                Some(Compass::North) if ns => len,
                Some(Compass::South) if ns => -len,
                Some(Compass::East) if ew => len,
                Some(Compass::West) if ew => -len,
                _ => 0,
            }
        })
        .sum()
}

/// Split `cars` into cohorts by the direction of their current shortest
/// route.  Returns one cohort for [`Directionality::None`], otherwise
/// `[A, B]` (either may be empty).  Every car lands in exactly one cohort,
/// in ascending index order.
pub fn partition(graph: &RoadGraph, cars: &[Car], directionality: Directionality) -> DispatchResult<Vec<Vec<CarIdx>>> {
    let all = (0..cars.len()).map(|i| CarIdx(i as u32));
    if directionality == Directionality::None {
        return Ok(vec![all.collect()]);
    }

    let network = graph.network();
    let mut a = Vec::new();
    let mut b = Vec::new();
    for idx in all {
        let car = &cars[idx.index()];
        let route = graph.shortest_path(car.from, car.to)?;
        if direction_score(network, &route.edges, directionality) <= 0 {
            a.push(idx);
        } else {
            b.push(idx);
        }
    }
    log::debug!("cohorts: {} / {} cars", a.len(), b.len());
    Ok(vec![a, b])
}
