//! Weighted routing graph and Dijkstra shortest paths.
//!
//! # Layout
//!
//! `RoadGraph` keeps a **Compressed Sparse Row (CSR)** adjacency over the
//! network's links.  Outgoing edges of node `n` occupy
//!
//! ```text
//! out_edges[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! Weights are stored per `EdgeId` as three factors:
//!
//! ```text
//! weight[e] = base[e] * penalty[e] * (1 + alpha * load[e])   (LoadAdjusted)
//! weight[e] = base[e] * penalty[e]                            (otherwise)
//! ```
//!
//! `base` follows the active [`WeightStrategy`], `penalty` is the multiplier
//! accumulated by calibration passes, and `load` comes from a [`LoadSource`]
//! (the running simulator).  Rebuilding replaces the whole adjacency;
//! refreshing only recomputes weights.  Neither may happen while a
//! simulation tick is in progress: callers hold the simulator by `&` here.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use td_core::{CrossId, EdgeId, NodeId, RoadId, WeightStrategy};

use crate::network::RoadNetwork;
use crate::{NetworkError, NetworkResult};

// ── Load source ───────────────────────────────────────────────────────────────

/// Anything that can report per-edge occupancy as a ratio in `[0, 1]`.
pub trait LoadSource {
    fn load(&self, edge: EdgeId) -> f64;
}

/// A load source for an empty network.
pub struct NoLoad;

impl LoadSource for NoLoad {
    #[inline]
    fn load(&self, _edge: EdgeId) -> f64 {
        0.0
    }
}

// ── Route ─────────────────────────────────────────────────────────────────────

/// The result of a routing query: an ordered list of `EdgeId`s and the total
/// weight at the time of the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub edges: Vec<EdgeId>,
    pub cost: f64,
}

impl Route {
    /// `true` if the source and destination are the same cross.
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Road ids in travel order.
    pub fn roads(&self, network: &RoadNetwork) -> Vec<RoadId> {
        network.route_roads(&self.edges)
    }
}

// ── RoadGraph ─────────────────────────────────────────────────────────────────

pub struct RoadGraph {
    network:        Arc<RoadNetwork>,
    strategy:       WeightStrategy,
    node_out_start: Vec<u32>,
    out_edges:      Vec<EdgeId>,
    base:           Vec<f64>,
    penalty:        Vec<f64>,
    weights:        Vec<f64>,
}

impl RoadGraph {
    /// Build the graph with `strategy` and an empty network load.
    pub fn new(network: Arc<RoadNetwork>, strategy: WeightStrategy) -> Self {
        let edge_count = network.edge_count();
        let mut graph = Self {
            network,
            strategy,
            node_out_start: Vec::new(),
            out_edges:      Vec::new(),
            base:           Vec::new(),
            penalty:        vec![1.0; edge_count],
            weights:        Vec::new(),
        };
        graph.rebuild(strategy, &NoLoad);
        graph
    }

    pub fn network(&self) -> &Arc<RoadNetwork> {
        &self.network
    }

    pub fn strategy(&self) -> WeightStrategy {
        self.strategy
    }

    /// Replace the adjacency and all weights using `strategy`.  Calibration
    /// penalties are kept.
    pub fn rebuild(&mut self, strategy: WeightStrategy, loads: &dyn LoadSource) {
        let net = &*self.network;
        let node_count = net.cross_count();

        let mut node_out_start = Vec::with_capacity(node_count + 1);
        let mut out_edges = Vec::with_capacity(net.edge_count());
        node_out_start.push(0u32);
        for n in 0..node_count {
            out_edges.extend_from_slice(net.outgoing(NodeId(n as u32)));
            node_out_start.push(out_edges.len() as u32);
        }

        self.base = net
            .links
            .iter()
            .map(|l| {
                let road = &net.roads[l.road];
                match strategy {
                    WeightStrategy::Length => road.length as f64,
                    WeightStrategy::TravelTime | WeightStrategy::LoadAdjusted { .. } => {
                        road.length as f64 / road.top_speed as f64
                    }
                }
            })
            .collect();
        self.penalty.resize(net.edge_count(), 1.0);
        self.node_out_start = node_out_start;
        self.out_edges = out_edges;
        self.strategy = strategy;
        self.weights = vec![0.0; net.edge_count()];
        self.recompute(loads);
    }

    /// Recompute weights from current loads.  A no-op unless the strategy is
    /// load-adjusted.
    pub fn refresh_loads(&mut self, loads: &dyn LoadSource) {
        if matches!(self.strategy, WeightStrategy::LoadAdjusted { .. }) {
            self.recompute(loads);
        }
    }

    fn recompute(&mut self, loads: &dyn LoadSource) {
        let alpha = match self.strategy {
            WeightStrategy::LoadAdjusted { alpha } => alpha,
            _ => 0.0,
        };
        for (i, w) in self.weights.iter_mut().enumerate() {
            let congestion = if alpha > 0.0 {
                1.0 + alpha * loads.load(EdgeId(i as u32)).clamp(0.0, 1.0)
            } else {
                1.0
            };
            *w = self.base[i] * self.penalty[i] * congestion;
        }
    }

    // ── Weights ───────────────────────────────────────────────────────────

    #[inline]
    pub fn edge_weight(&self, edge: EdgeId) -> f64 {
        self.weights[edge.index()]
    }

    /// Overwrite one edge weight.  The value holds until the next
    /// `rebuild`/`refresh_loads`.
    pub fn set_edge_weight(&mut self, edge: EdgeId, weight: f64) -> NetworkResult<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(NetworkError::InvalidWeight(weight));
        }
        self.weights[edge.index()] = weight;
        Ok(())
    }

    /// Multiply the weight of every direction of `road` by `factor`.  The
    /// multiplier persists across refreshes.
    pub fn penalize_road(&mut self, road: RoadId, factor: f64) -> NetworkResult<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(NetworkError::InvalidWeight(factor));
        }
        for edge in self.network.links_of(road)?.into_iter().flatten() {
            self.penalty[edge.index()] *= factor;
            self.weights[edge.index()] *= factor;
        }
        Ok(())
    }

    /// Current penalty multiplier of `edge`.
    pub fn penalty(&self, edge: EdgeId) -> f64 {
        self.penalty[edge.index()]
    }

    /// Drop every calibration penalty.
    pub fn reset_penalties(&mut self, loads: &dyn LoadSource) {
        self.penalty.iter_mut().for_each(|p| *p = 1.0);
        self.recompute(loads);
    }

    // ── Loads ─────────────────────────────────────────────────────────────

    /// Occupancy ratio of `edge`, clamped to `[0, 1]`.
    #[inline]
    pub fn load_of(&self, edge: EdgeId, loads: &dyn LoadSource) -> f64 {
        loads.load(edge).clamp(0.0, 1.0)
    }

    /// `true` if any edge of `route` is loaded strictly above `threshold`.
    pub fn is_congested(&self, route: &Route, loads: &dyn LoadSource, threshold: f64) -> bool {
        route.edges.iter().any(|&e| self.load_of(e, loads) > threshold)
    }

    // ── Traversal ─────────────────────────────────────────────────────────

    #[inline]
    pub fn out_edges(&self, node: NodeId) -> &[EdgeId] {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        &self.out_edges[start..end]
    }

    /// Dijkstra shortest path between two crosses under the current weights.
    ///
    /// `from == to` yields an empty route rather than an error.
    pub fn shortest_path(&self, from: CrossId, to: CrossId) -> NetworkResult<Route> {
        let src = self.network.node(from)?;
        let dst = self.network.node(to)?;
        if src == dst {
            return Ok(Route { edges: vec![], cost: 0.0 });
        }

        let n = self.network.cross_count();
        let mut dist      = vec![f64::INFINITY; n];
        let mut prev_edge = vec![EdgeId::INVALID; n];
        dist[src.index()] = 0.0;

        // Min-heap on (cost, node); node index breaks ties deterministically.
        let mut heap: BinaryHeap<Reverse<(Cost, NodeId)>> = BinaryHeap::new();
        heap.push(Reverse((Cost(0.0), src)));

        while let Some(Reverse((Cost(cost), node))) = heap.pop() {
            if node == dst {
                return Ok(self.reconstruct(&prev_edge, dst, cost));
            }
            // Skip stale heap entries.
            if cost > dist[node.index()] {
                continue;
            }
            for &edge in self.out_edges(node) {
                let neighbor = self.network.link(edge).to;
                let new_cost = cost + self.weights[edge.index()];
                if new_cost < dist[neighbor.index()] {
                    dist[neighbor.index()] = new_cost;
                    prev_edge[neighbor.index()] = edge;
                    heap.push(Reverse((Cost(new_cost), neighbor)));
                }
            }
        }

        Err(NetworkError::NoRoute { from, to })
    }

    fn reconstruct(&self, prev_edge: &[EdgeId], to: NodeId, cost: f64) -> Route {
        let mut edges = Vec::new();
        let mut cur = to;
        loop {
            let e = prev_edge[cur.index()];
            if e == EdgeId::INVALID {
                break;
            }
            edges.push(e);
            cur = self.network.link(e).from;
        }
        edges.reverse();
        Route { edges, cost }
    }
}

/// Totally ordered `f64` for the Dijkstra heap.  Weights are validated to be
/// finite and non-negative.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Cost(f64);

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
