//! Road network entities and their index-based container.
//!
//! # Data layout
//!
//! Crosses and roads are stored in ascending external-id order, so iterating
//! the arrays visits them in the order the tick engine requires.  Every
//! road produces one directed traversal (`Link`) per direction it can be
//! driven in; links are indexed by [`EdgeId`] in (road id, forward first)
//! order.
//!
//! ```text
//! roads[i]          physical road (length, speed, lanes, endpoints)
//! links[e]          one direction of roads[links[e].road]
//! node_in[n]        links ending at crosses[n], ascending road id
//! node_out[n]       links starting at crosses[n], ascending road id
//! ```
//!
//! External ids are resolved to dense indices once through `FxHashMap`s;
//! everything after load works on `NodeId`/`EdgeId`.

use rustc_hash::FxHashMap;

use td_core::{CrossId, EdgeId, NodeId, RoadId};

use crate::{NetworkError, NetworkResult};

// ── Compass ───────────────────────────────────────────────────────────────────

/// Compass position of a road slot at a cross.  Slots are listed clockwise
/// starting from north.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Compass {
    North,
    East,
    South,
    West,
}

impl Compass {
    pub const ALL: [Compass; 4] = [Compass::North, Compass::East, Compass::South, Compass::West];

    #[inline]
    pub fn from_slot(slot: usize) -> Compass {
        Self::ALL[slot % 4]
    }

    #[inline]
    pub fn slot(self) -> usize {
        self as usize
    }
}

// ── Entities ──────────────────────────────────────────────────────────────────

/// A crossroad with up to four incident roads in fixed clockwise slots.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cross {
    pub id: CrossId,
    /// North, east, south, west.  `None` marks an empty slot.
    pub slots: [Option<RoadId>; 4],
}

impl Cross {
    pub fn new(id: CrossId, slots: [Option<RoadId>; 4]) -> Self {
        Self { id, slots }
    }

    /// Slot index of `road` at this cross, if it is incident.
    pub fn slot_of(&self, road: RoadId) -> Option<usize> {
        self.slots.iter().position(|s| *s == Some(road))
    }
}

/// A physical road between two crosses.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Road {
    pub id: RoadId,
    pub start: CrossId,
    pub end: CrossId,
    /// Length in cells.
    pub length: u32,
    /// Top speed in cells per tick.
    pub top_speed: u32,
    /// Lanes per direction.
    pub lanes: u32,
    /// Two independent directions, each with its own lane set.
    pub bidirectional: bool,
}

impl Road {
    /// Cells available in one direction.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.lanes * self.length
    }
}

/// One directed traversal of a road.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Link {
    /// Index into `RoadNetwork::roads`.
    pub road: usize,
    pub road_id: RoadId,
    pub from: NodeId,
    pub to: NodeId,
    /// `true` for the end→start direction of a bidirectional road.
    pub reverse: bool,
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Immutable road network.  Do not construct directly; use
/// [`RoadNetworkBuilder`].
#[derive(Debug)]
pub struct RoadNetwork {
    /// Crosses in ascending id order, indexed by `NodeId`.
    pub crosses: Vec<Cross>,
    /// Roads in ascending id order.
    pub roads: Vec<Road>,
    /// Directed traversals, indexed by `EdgeId`.
    pub links: Vec<Link>,
    /// Incoming links per node, ascending road id.
    pub node_in: Vec<Vec<EdgeId>>,
    /// Outgoing links per node, ascending road id.
    pub node_out: Vec<Vec<EdgeId>>,

    cross_index: FxHashMap<CrossId, NodeId>,
    road_index: FxHashMap<RoadId, usize>,
    /// `[forward, reverse]` link of each road; reverse is `INVALID` for
    /// one-way roads.
    road_links: Vec<[EdgeId; 2]>,
}

impl RoadNetwork {
    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn cross_count(&self) -> usize {
        self.crosses.len()
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    pub fn edge_count(&self) -> usize {
        self.links.len()
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    pub fn node(&self, id: CrossId) -> NetworkResult<NodeId> {
        self.cross_index
            .get(&id)
            .copied()
            .ok_or(NetworkError::UnknownCross(id))
    }

    #[inline]
    pub fn cross(&self, node: NodeId) -> &Cross {
        &self.crosses[node.index()]
    }

    pub fn road(&self, id: RoadId) -> NetworkResult<&Road> {
        self.road_index
            .get(&id)
            .map(|&i| &self.roads[i])
            .ok_or(NetworkError::UnknownRoad(id))
    }

    #[inline]
    pub fn link(&self, edge: EdgeId) -> &Link {
        &self.links[edge.index()]
    }

    /// The physical road an edge traverses.
    #[inline]
    pub fn road_of(&self, edge: EdgeId) -> &Road {
        &self.roads[self.links[edge.index()].road]
    }

    /// Both directed links of a road (`None` for the missing direction of a
    /// one-way road).
    pub fn links_of(&self, road: RoadId) -> NetworkResult<[Option<EdgeId>; 2]> {
        let i = *self.road_index.get(&road).ok_or(NetworkError::UnknownRoad(road))?;
        let [fwd, rev] = self.road_links[i];
        Ok([
            Some(fwd),
            (rev != EdgeId::INVALID).then_some(rev),
        ])
    }

    /// The link that drives `road` away from `from`, if any.
    pub fn edge_from(&self, road: RoadId, from: NodeId) -> NetworkResult<Option<EdgeId>> {
        Ok(self
            .links_of(road)?
            .into_iter()
            .flatten()
            .find(|e| self.links[e.index()].from == from))
    }

    #[inline]
    pub fn incoming(&self, node: NodeId) -> &[EdgeId] {
        &self.node_in[node.index()]
    }

    #[inline]
    pub fn outgoing(&self, node: NodeId) -> &[EdgeId] {
        &self.node_out[node.index()]
    }

    /// Compass direction in which `edge` leaves its source cross.
    pub fn compass(&self, edge: EdgeId) -> Option<Compass> {
        let link = self.link(edge);
        self.cross(link.from)
            .slot_of(link.road_id)
            .map(Compass::from_slot)
    }

    // ── Routes ────────────────────────────────────────────────────────────

    /// Convert a list of road ids into a contiguous chain of links starting
    /// at `from` and ending at `to`.
    ///
    /// Fails with [`NetworkError::InvalidRoute`] if consecutive roads do not
    /// share a cross, a road is driven against its direction, or the chain
    /// does not end at `to`.
    pub fn resolve_route(
        &self,
        from:  CrossId,
        to:    CrossId,
        roads: &[RoadId],
    ) -> NetworkResult<Vec<EdgeId>> {
        let invalid = |reason: String| NetworkError::InvalidRoute { from, to, reason };

        let mut at = self.node(from)?;
        let target = self.node(to)?;
        let mut edges = Vec::with_capacity(roads.len());
        for &road in roads {
            let edge = self
                .edge_from(road, at)?
                .ok_or_else(|| invalid(format!("{road} cannot be driven away from {}", self.cross(at).id)))?;
            edges.push(edge);
            at = self.links[edge.index()].to;
        }
        if at != target {
            return Err(invalid(format!("route ends at {}", self.cross(at).id)));
        }
        Ok(edges)
    }

    /// `true` if `edges` is a contiguous chain from `from` to `to`.
    pub fn is_contiguous(&self, from: NodeId, to: NodeId, edges: &[EdgeId]) -> bool {
        let mut at = from;
        for &e in edges {
            let link = self.link(e);
            if link.from != at {
                return false;
            }
            at = link.to;
        }
        at == to
    }

    /// Road ids of a link chain, in travel order.
    pub fn route_roads(&self, edges: &[EdgeId]) -> Vec<RoadId> {
        edges.iter().map(|e| self.links[e.index()].road_id).collect()
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// Entities may be added in any order.  `build()` sorts them, resolves every
/// cross/road reference, and lays out the directed links.
///
/// # Example
///
/// ```
/// use td_core::{CrossId, RoadId};
/// use td_network::{Cross, Road, RoadNetworkBuilder};
///
/// let mut b = RoadNetworkBuilder::new();
/// b.add_cross(Cross::new(CrossId(1), [None, Some(RoadId(10)), None, None]));
/// b.add_cross(Cross::new(CrossId(2), [None, None, None, Some(RoadId(10))]));
/// b.add_road(Road {
///     id: RoadId(10), start: CrossId(1), end: CrossId(2),
///     length: 5, top_speed: 2, lanes: 1, bidirectional: true,
/// });
/// let net = b.build().unwrap();
/// assert_eq!(net.cross_count(), 2);
/// assert_eq!(net.edge_count(), 2); // bidirectional
/// ```
#[derive(Default)]
pub struct RoadNetworkBuilder {
    crosses: Vec<Cross>,
    roads:   Vec<Road>,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(crosses: usize, roads: usize) -> Self {
        Self {
            crosses: Vec::with_capacity(crosses),
            roads:   Vec::with_capacity(roads),
        }
    }

    pub fn add_cross(&mut self, cross: Cross) -> &mut Self {
        self.crosses.push(cross);
        self
    }

    pub fn add_road(&mut self, road: Road) -> &mut Self {
        self.roads.push(road);
        self
    }

    pub fn cross_count(&self) -> usize { self.crosses.len() }
    pub fn road_count(&self) -> usize { self.roads.len() }

    /// Consume the builder and produce a [`RoadNetwork`].
    pub fn build(self) -> NetworkResult<RoadNetwork> {
        let mut crosses = self.crosses;
        let mut roads = self.roads;
        crosses.sort_unstable_by_key(|c| c.id);
        roads.sort_unstable_by_key(|r| r.id);

        // ── Index external ids ────────────────────────────────────────────
        let mut cross_index = FxHashMap::default();
        cross_index.reserve(crosses.len());
        for (i, c) in crosses.iter().enumerate() {
            if cross_index.insert(c.id, NodeId(i as u32)).is_some() {
                return Err(NetworkError::Topology(format!("duplicate cross {}", c.id)));
            }
        }
        let mut road_index = FxHashMap::default();
        road_index.reserve(roads.len());
        for (i, r) in roads.iter().enumerate() {
            if road_index.insert(r.id, i).is_some() {
                return Err(NetworkError::Topology(format!("duplicate road {}", r.id)));
            }
            if r.length == 0 || r.top_speed == 0 || r.lanes == 0 {
                return Err(NetworkError::Topology(format!(
                    "{} must have positive length, speed and lane count",
                    r.id
                )));
            }
        }

        // ── Validate references ───────────────────────────────────────────
        for c in &crosses {
            for road in c.slots.iter().flatten() {
                let r = &roads[*road_index.get(road).ok_or(NetworkError::UnknownRoad(*road))?];
                if r.start != c.id && r.end != c.id {
                    return Err(NetworkError::Topology(format!(
                        "{} lists {} which does not touch it",
                        c.id, r.id
                    )));
                }
            }
        }

        // ── Lay out directed links ────────────────────────────────────────
        let node_count = crosses.len();
        let mut links = Vec::with_capacity(roads.len() * 2);
        let mut road_links = Vec::with_capacity(roads.len());
        let mut node_in = vec![Vec::new(); node_count];
        let mut node_out = vec![Vec::new(); node_count];

        for (i, r) in roads.iter().enumerate() {
            let a = *cross_index.get(&r.start).ok_or(NetworkError::UnknownCross(r.start))?;
            let b = *cross_index.get(&r.end).ok_or(NetworkError::UnknownCross(r.end))?;

            let fwd = EdgeId(links.len() as u32);
            links.push(Link { road: i, road_id: r.id, from: a, to: b, reverse: false });
            node_out[a.index()].push(fwd);
            node_in[b.index()].push(fwd);

            let rev = if r.bidirectional {
                let rev = EdgeId(links.len() as u32);
                links.push(Link { road: i, road_id: r.id, from: b, to: a, reverse: true });
                node_out[b.index()].push(rev);
                node_in[a.index()].push(rev);
                rev
            } else {
                EdgeId::INVALID
            };
            road_links.push([fwd, rev]);
        }
        // Roads were visited in ascending id, so every adjacency list is
        // already in ascending road-id order.

        Ok(RoadNetwork {
            crosses,
            roads,
            links,
            node_in,
            node_out,
            cross_index,
            road_index,
            road_links,
        })
    }
}
