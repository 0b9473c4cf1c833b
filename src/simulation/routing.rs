//! Route resolution
//!
//! The core never computes geometry inline. It files a [`RouteRequest`] in the
//! [`RouteQueue`], and a later tick hands the due requests to a [`Router`] and
//! applies the results. Routers may fail; [`resolve_route`] turns any failure
//! into a straight line so a mission is never aborted for lack of a route.

use log::{debug, warn};
use ordered_float::OrderedFloat;
use petgraph::algo::astar;
use petgraph::stable_graph::{NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use super::node::SimNode;
use super::path::{Path, RouteData};
use super::types::{GeoPoint, NodeId, OrderId, PathId, RouteTicket, SimId, VehicleId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    #[error("no network node within {distance_m:.0} m of {point}")]
    NoNearbyNode { point: GeoPoint, distance_m: f64 },
    #[error("no path between {from} and {to}")]
    Unreachable { from: NodeId, to: NodeId },
    #[error("routing service unavailable: {0}")]
    Unavailable(String),
}

/// Edge data for the path network graph
#[derive(Debug, Clone)]
pub struct PathEdge {
    pub path_id: PathId,
    pub distance_m: f64,
    /// Node the geometry starts at
    pub geometry_start: NodeId,
    pub geometry: Vec<GeoPoint>,
}

/// Graph of nodes joined by permanent, active paths
#[derive(Default)]
pub struct PathNetwork {
    graph: StableUnGraph<NodeId, PathEdge>,

    /// Maps simulation node IDs to their indices in the graph
    node_to_index: HashMap<NodeId, NodeIndex>,

    /// Node positions for snapping endpoints
    positions: HashMap<NodeId, GeoPoint>,
}

impl PathNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a network from scratch, e.g. after importing a saved state
    pub fn rebuild<'a>(
        nodes: impl IntoIterator<Item = &'a SimNode>,
        paths: impl IntoIterator<Item = &'a Path>,
    ) -> Self {
        let mut network = Self::new();
        for node in nodes {
            network.add_node(node.id, node.position);
        }
        for path in paths {
            network.add_path(path);
        }
        network
    }

    pub fn add_node(&mut self, id: NodeId, position: GeoPoint) {
        self.positions.insert(id, position);
        if self.node_to_index.contains_key(&id) {
            return;
        }
        let index = self.graph.add_node(id);
        self.node_to_index.insert(id, index);
    }

    /// Drops the node and every edge touching it
    pub fn remove_node(&mut self, id: NodeId) {
        self.positions.remove(&id);
        if let Some(index) = self.node_to_index.remove(&id) {
            self.graph.remove_node(index);
        }
    }

    pub fn move_node(&mut self, id: NodeId, position: GeoPoint) {
        if let Some(old) = self.positions.get_mut(&id) {
            *old = position;
        }
    }

    /// Adds a path as an edge. Temporary, inactive and free-point paths are
    /// not part of the network.
    pub fn add_path(&mut self, path: &Path) {
        if path.temporary || !path.active {
            return;
        }
        let (Some(a), Some(b)) = (path.start.node(), path.end.node()) else {
            return;
        };
        let (Some(&ia), Some(&ib)) = (self.node_to_index.get(&a), self.node_to_index.get(&b))
        else {
            return;
        };
        self.graph.add_edge(
            ia,
            ib,
            PathEdge {
                path_id: path.id,
                distance_m: path.total_distance_m(),
                geometry_start: a,
                geometry: path.geometry.clone(),
            },
        );
    }

    pub fn remove_path(&mut self, path_id: PathId) {
        let edge = self
            .graph
            .edge_indices()
            .find(|e| self.graph[*e].path_id == path_id);
        if let Some(edge) = edge {
            self.graph.remove_edge(edge);
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_to_index.len()
    }

    pub fn path_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Find the closest node to a point, with its distance in meters
    pub fn closest_node(&self, point: &GeoPoint) -> Option<(NodeId, f64)> {
        self.positions
            .iter()
            .map(|(id, pos)| (*id, point.distance_m(pos)))
            .min_by_key(|(id, distance)| (OrderedFloat(*distance), *id))
    }

    /// Shortest node sequence between two nodes, A* with a great-circle
    /// heuristic
    pub fn find_node_path(&self, start: NodeId, end: NodeId) -> Option<Vec<NodeId>> {
        let start_index = *self.node_to_index.get(&start)?;
        let end_index = *self.node_to_index.get(&end)?;
        let goal = *self.positions.get(&end)?;

        let (_, indices) = astar(
            &self.graph,
            start_index,
            |index| index == end_index,
            |edge| edge.weight().distance_m,
            |index| {
                self.positions
                    .get(&self.graph[index])
                    .map(|pos| pos.distance_m(&goal))
                    .unwrap_or(0.0)
            },
        )?;

        Some(indices.into_iter().map(|index| self.graph[index]).collect())
    }

    /// Polyline from `a` to `b` along the shortest edge joining them
    fn edge_geometry(&self, a: NodeId, b: NodeId) -> Option<Vec<GeoPoint>> {
        let ia = *self.node_to_index.get(&a)?;
        let ib = *self.node_to_index.get(&b)?;
        let edge = self
            .graph
            .edges(ia)
            .filter(|edge| edge.target() == ib)
            .min_by_key(|edge| OrderedFloat(edge.weight().distance_m))?;

        let weight = edge.weight();
        let mut geometry = weight.geometry.clone();
        if weight.geometry_start != a {
            geometry.reverse();
        }
        Some(geometry)
    }

    /// Concatenated polyline along a node sequence
    pub fn geometry_along(&self, nodes: &[NodeId]) -> Option<Vec<GeoPoint>> {
        let mut geometry = Vec::new();
        for pair in nodes.windows(2) {
            geometry.extend(self.edge_geometry(pair[0], pair[1])?);
        }
        Some(geometry)
    }
}

/// The routing collaborator
pub trait Router {
    fn route(
        &mut self,
        network: &PathNetwork,
        from: GeoPoint,
        to: GeoPoint,
    ) -> Result<RouteData, RouteError>;
}

/// Always answers with a single straight segment
#[derive(Debug, Default, Clone, Copy)]
pub struct StraightLineRouter;

impl Router for StraightLineRouter {
    fn route(
        &mut self,
        _network: &PathNetwork,
        from: GeoPoint,
        to: GeoPoint,
    ) -> Result<RouteData, RouteError> {
        Ok(RouteData::straight_line(from, to))
    }
}

/// Routes along user-built paths: both endpoints snap to their nearest node,
/// then A* picks the shortest chain of paths between them.
#[derive(Debug, Clone, Copy)]
pub struct NetworkRouter {
    pub snap_distance_m: f64,
}

impl NetworkRouter {
    pub fn new(snap_distance_m: f64) -> Self {
        Self { snap_distance_m }
    }

    fn snap(&self, network: &PathNetwork, point: GeoPoint) -> Result<NodeId, RouteError> {
        match network.closest_node(&point) {
            Some((id, distance)) if distance <= self.snap_distance_m => Ok(id),
            _ => Err(RouteError::NoNearbyNode {
                point,
                distance_m: self.snap_distance_m,
            }),
        }
    }
}

impl Router for NetworkRouter {
    fn route(
        &mut self,
        network: &PathNetwork,
        from: GeoPoint,
        to: GeoPoint,
    ) -> Result<RouteData, RouteError> {
        let start = self.snap(network, from)?;
        let end = self.snap(network, to)?;

        let nodes = network
            .find_node_path(start, end)
            .ok_or(RouteError::Unreachable {
                from: start,
                to: end,
            })?;
        let along = network
            .geometry_along(&nodes)
            .ok_or(RouteError::Unreachable {
                from: start,
                to: end,
            })?;

        let mut geometry = Vec::with_capacity(along.len() + 2);
        geometry.push(from);
        geometry.extend(along);
        geometry.push(to);

        let route = RouteData::from_geometry(geometry);
        if route.segments.is_empty() {
            return Ok(RouteData::straight_line(from, to));
        }
        Ok(route)
    }
}

/// Ask the router, falling back to a straight line on failure
pub fn resolve_route(
    router: &mut dyn Router,
    network: &PathNetwork,
    from: GeoPoint,
    to: GeoPoint,
) -> RouteData {
    match router.route(network, from, to) {
        Ok(route) if !route.segments.is_empty() => route,
        Ok(_) => {
            warn!("Router returned an empty route from {} to {}; using a straight line", from, to);
            RouteData::straight_line(from, to)
        }
        Err(err @ RouteError::Unavailable(_)) => {
            warn!("Routing failed ({}); using a straight line from {} to {}", err, from, to);
            RouteData::straight_line(from, to)
        }
        Err(err) => {
            debug!("{}; using a straight line from {} to {}", err, from, to);
            RouteData::straight_line(from, to)
        }
    }
}

/// Why a route was requested, and what to do with it once it arrives
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RoutePurpose {
    /// Provider -> requester for a dispatched order
    Deliver {
        order: OrderId,
        vehicle: VehicleId,
        provider: NodeId,
        requester: NodeId,
    },
    /// Back to the home node after a drop-off. Carries the order when the
    /// goods are coming back undelivered.
    Return {
        #[serde(default)]
        order: Option<OrderId>,
        vehicle: VehicleId,
        origin: Option<NodeId>,
        home: NodeId,
    },
    /// A free vehicle heading to a node to dock
    Assign { vehicle: VehicleId, node: NodeId },
    /// A free vehicle heading to a point
    Move { vehicle: VehicleId, target: GeoPoint },
    /// A permanent path requested by the user
    UserPath { from: NodeId, to: NodeId },
}

impl RoutePurpose {
    pub fn vehicle(&self) -> Option<VehicleId> {
        match self {
            RoutePurpose::Deliver { vehicle, .. }
            | RoutePurpose::Return { vehicle, .. }
            | RoutePurpose::Assign { vehicle, .. }
            | RoutePurpose::Move { vehicle, .. } => Some(*vehicle),
            RoutePurpose::UserPath { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub ticket: RouteTicket,
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub purpose: RoutePurpose,
    /// First tick at which the result may be applied
    pub due_tick: u64,
}

/// Outstanding route requests, oldest first
#[derive(Debug, Clone)]
pub struct RouteQueue {
    pending: VecDeque<RouteRequest>,
    latency_ticks: u64,
    next_ticket: u64,
}

impl RouteQueue {
    pub fn new(latency_ticks: u64) -> Self {
        Self {
            pending: VecDeque::new(),
            latency_ticks: latency_ticks.max(1),
            next_ticket: 1,
        }
    }

    pub fn submit(
        &mut self,
        from: GeoPoint,
        to: GeoPoint,
        purpose: RoutePurpose,
        current_tick: u64,
    ) -> RouteTicket {
        let ticket = RouteTicket(SimId(self.next_ticket));
        self.next_ticket += 1;
        debug!("Route request {} filed for {:?}", ticket, purpose);
        self.pending.push_back(RouteRequest {
            ticket,
            from,
            to,
            purpose,
            due_tick: current_tick + self.latency_ticks,
        });
        ticket
    }

    /// Remove and return every request whose result may be applied now
    pub fn take_due(&mut self, current_tick: u64) -> Vec<RouteRequest> {
        let (due, waiting): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|request| request.due_tick <= current_tick);
        self.pending = waiting.into();
        due
    }

    /// Drop requests that concern a vehicle that no longer exists
    pub fn cancel_for_vehicle(&mut self, vehicle: VehicleId) {
        self.pending
            .retain(|request| request.purpose.vehicle() != Some(vehicle));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn requests(&self) -> impl Iterator<Item = &RouteRequest> {
        self.pending.iter()
    }

    /// Replace the queue, e.g. from a saved state. Ticket numbering continues
    /// above the highest restored ticket.
    pub fn restore(&mut self, requests: Vec<RouteRequest>) {
        self.next_ticket = requests
            .iter()
            .map(|r| r.ticket.raw() + 1)
            .max()
            .unwrap_or(1)
            .max(self.next_ticket);
        self.pending = requests.into();
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.next_ticket = 1;
    }
}
