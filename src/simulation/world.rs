//! Main simulation world that ties everything together
//!
//! Owns the registries, the route queue and router, and the RNG. The driver
//! calls [`SimWorld::update`] once per frame; everything else is a command
//! that applies immediately.

use log::{debug, info, warn};
use std::f64::consts::TAU;

use super::config::SimConfig;
use super::error::SimError;
use super::events::{SimEvent, SimObserver};
use super::fleet::{
    self, advance_order, close_returned_order, dock_vehicle, launch_on_route, release_vehicle,
};
use super::node::{NodeEdit, NodeKind, SimNode};
use super::node_logic;
use super::order::{Order, OrderStatus};
use super::path::{Path, PathEnd, RouteData};
use super::persistence::{PersistenceError, SaveData};
use super::rng::SimRng;
use super::routing::{
    resolve_route, NetworkRouter, PathNetwork, RoutePurpose, RouteQueue, RouteRequest, Router,
};
use super::snapshot::WorldSnapshot;
use super::state::SimState;
use super::types::{item_total, items, GeoPoint, ItemSet, NodeId, OrderId, PathId, VehicleId};
use super::vehicle::{Mission, MissionKind, MissionTarget, SimVehicle, VehicleKind, VehicleStatus};

/// The main simulation world
pub struct SimWorld {
    /// Entity registries, money and clock
    state: SimState,

    config: SimConfig,

    /// Routes requested but not yet applied
    routes: RouteQueue,

    /// Graph of permanent paths, kept in step with `state`
    network: PathNetwork,

    router: Box<dyn Router>,

    rng: SimRng,

    observers: Vec<Box<dyn SimObserver>>,

    /// Events not yet drained by the caller
    outbox: Vec<SimEvent>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    fn new_internal(config: SimConfig, rng: SimRng) -> Self {
        let config = config.normalized();
        Self {
            state: SimState::new(config.starting_money, config.production_active),
            routes: RouteQueue::new(config.route_latency_ticks),
            network: PathNetwork::new(),
            router: Box::new(NetworkRouter::new(config.route_snap_distance_m)),
            rng,
            observers: Vec::new(),
            outbox: Vec::new(),
            config,
        }
    }

    pub fn new() -> Self {
        Self::new_internal(SimConfig::default(), SimRng::unseeded())
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(seed: u64) -> Self {
        Self::new_internal(SimConfig::default(), SimRng::from_seed(seed))
    }

    pub fn with_config(config: SimConfig, seed: Option<u64>) -> Self {
        let rng = seed.map(SimRng::from_seed).unwrap_or_default();
        Self::new_internal(config, rng)
    }

    /// Swap the routing collaborator
    pub fn with_router(mut self, router: Box<dyn Router>) -> Self {
        self.router = router;
        self
    }

    /// Read-only view of the registries. Every change goes through a command.
    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn network(&self) -> &PathNetwork {
        &self.network
    }

    pub fn pending_routes(&self) -> usize {
        self.routes.len()
    }

    pub fn money(&self) -> f64 {
        self.state.economy.money
    }

    pub fn now_ms(&self) -> f64 {
        self.state.now_ms
    }

    pub fn add_observer(&mut self, observer: Box<dyn SimObserver>) {
        self.observers.push(observer);
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn emit(&mut self, event: SimEvent) {
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
        self.outbox.push(event);
    }

    fn emit_all(&mut self, events: Vec<SimEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    fn emit_changed(&mut self, events: Vec<SimEvent>) {
        self.emit_all(events);
        self.emit(SimEvent::StateChanged);
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(&self.state)
    }

    /* ------------------------------------------------------------------ */
    /* Tick                                                               */
    /* ------------------------------------------------------------------ */

    /// Advance the world by `delta_ms`, with `now_ms` the time of this frame
    pub fn update(&mut self, delta_ms: f64, now_ms: f64) {
        self.state.now_ms = now_ms;
        self.state.tick += 1;

        let mut events = self.apply_due_routes();
        events.extend(node_logic::update_production(&mut self.state));
        events.extend(node_logic::update_transformers(&mut self.state));
        events.extend(node_logic::update_stores(
            &mut self.state,
            &self.config,
            &mut self.rng,
        ));
        events.extend(node_logic::process_pending_orders(
            &mut self.state,
            &mut self.routes,
        ));
        events.extend(fleet::update_vehicles(
            &mut self.state,
            &mut self.routes,
            delta_ms,
        ));
        events.extend(node_logic::update_clients(&mut self.state, delta_ms));

        self.emit_changed(events);
    }

    /// Advance by `delta_ms` from the world's own clock
    pub fn tick(&mut self, delta_ms: f64) {
        let now = self.state.now_ms + delta_ms;
        self.update(delta_ms, now);
    }

    /// Run the dispatch pass outside the tick, e.g. right after creating an
    /// order. Orders already dispatched are not touched again.
    pub fn dispatch_orders(&mut self) {
        let events = node_logic::process_pending_orders(&mut self.state, &mut self.routes);
        self.emit_changed(events);
    }

    fn apply_due_routes(&mut self) -> Vec<SimEvent> {
        let mut events = Vec::new();
        for request in self.routes.take_due(self.state.tick) {
            let route = resolve_route(
                self.router.as_mut(),
                &self.network,
                request.from,
                request.to,
            );
            events.extend(self.apply_route(request, route));
        }
        events
    }

    /// The vehicle is still around and still waiting for this very request
    fn awaits_route(&self, request: &RouteRequest) -> Option<VehicleId> {
        let vehicle_id = request.purpose.vehicle()?;
        let vehicle = self.state.vehicles.get(&vehicle_id)?;
        (vehicle.pending_route == Some(request.ticket)).then_some(vehicle_id)
    }

    fn apply_route(&mut self, request: RouteRequest, route: RouteData) -> Vec<SimEvent> {
        if let RoutePurpose::UserPath { from, to } = request.purpose {
            return match self.insert_path(from, to, route) {
                Ok(path_id) => {
                    info!("Path {} built between {} and {}", path_id, from, to);
                    vec![SimEvent::PathAdded(path_id)]
                }
                Err(err) => {
                    debug!("Dropping routed path: {}", err);
                    Vec::new()
                }
            };
        }

        let Some(vehicle_id) = self.awaits_route(&request) else {
            debug!("Route {} no longer wanted", request.ticket);
            return Vec::new();
        };

        let returning = match request.purpose {
            RoutePurpose::Return { order, .. } => order,
            _ => None,
        };
        let node_exists = |id: &NodeId| self.state.nodes.contains_key(id);
        let plan = match request.purpose {
            RoutePurpose::Deliver {
                order,
                provider,
                requester,
                ..
            } => Some((
                PathEnd::Node(provider),
                PathEnd::Node(requester),
                Mission {
                    order: Some(order),
                    kind: MissionKind::Deliver,
                    target: MissionTarget::Node(requester),
                },
            )),
            RoutePurpose::Return { origin, home, .. } if node_exists(&home) => Some((
                origin.map_or(PathEnd::Point(request.from), PathEnd::Node),
                PathEnd::Node(home),
                Mission {
                    order: returning,
                    kind: MissionKind::Return,
                    target: MissionTarget::Node(home),
                },
            )),
            RoutePurpose::Assign { node, .. } if node_exists(&node) => Some((
                PathEnd::Point(request.from),
                PathEnd::Node(node),
                Mission {
                    order: None,
                    kind: MissionKind::Assign,
                    target: MissionTarget::Node(node),
                },
            )),
            RoutePurpose::Move { target, .. } => Some((
                PathEnd::Point(request.from),
                PathEnd::Point(target),
                Mission {
                    order: None,
                    kind: MissionKind::Move,
                    target: MissionTarget::Point(target),
                },
            )),
            _ => None,
        };

        let Some((start, end, mission)) = plan else {
            debug!(
                "Target of route {} vanished; releasing vehicle {}",
                request.ticket, vehicle_id
            );
            return self.abandon_route(vehicle_id, request.from, returning);
        };

        let Some((_, mut events)) =
            launch_on_route(&mut self.state, vehicle_id, start, end, route, mission)
        else {
            return self.abandon_route(vehicle_id, request.from, returning);
        };

        if let (MissionKind::Deliver, Some(order_id)) = (mission.kind, mission.order) {
            events.extend(advance_order(
                &mut self.state,
                order_id,
                OrderStatus::Delivering,
            ));
        }
        events
    }

    /// The vehicle can't use its route: let it go free where it stands
    fn abandon_route(
        &mut self,
        vehicle_id: VehicleId,
        at: GeoPoint,
        returning: Option<OrderId>,
    ) -> Vec<SimEvent> {
        let mut events = release_vehicle(&mut self.state, vehicle_id, at);
        events.extend(close_returned_order(&mut self.state, returning));
        events
    }

    /* ------------------------------------------------------------------ */
    /* Nodes                                                              */
    /* ------------------------------------------------------------------ */

    /// Add a node. Sources start with one motorbike in their fleet.
    pub fn add_node(&mut self, position: GeoPoint, kind: NodeKind) -> NodeId {
        let id = self.state.ids.node();
        self.state
            .nodes
            .insert(id, SimNode::new(id, position, kind, self.state.now_ms));
        self.network.add_node(id, position);

        let mut events = vec![SimEvent::NodeAdded(id)];
        if kind == NodeKind::Source {
            events.extend(self.spawn_docked_vehicle(id, VehicleKind::Moto));
        }
        debug!("Node {} ({:?}) added at {}", id, kind, position);
        self.emit_changed(events);
        id
    }

    fn spawn_docked_vehicle(&mut self, node_id: NodeId, kind: VehicleKind) -> Vec<SimEvent> {
        let Some(node) = self.state.nodes.get_mut(&node_id) else {
            return Vec::new();
        };
        let vehicle_id = self.state.ids.vehicle();
        let mut vehicle = SimVehicle::new(vehicle_id, kind, self.config.speed_factor);
        vehicle.dock(node_id);
        node.add_to_fleet(vehicle_id);
        self.state.vehicles.insert(vehicle_id, vehicle);
        vec![
            SimEvent::VehicleAdded(vehicle_id),
            SimEvent::VehicleDocked {
                vehicle: vehicle_id,
                node: node_id,
            },
        ]
    }

    /// Remove a node with its paths and the vehicles docked there. Vehicles
    /// out on a trip carry on and find no home when they come back.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<(), SimError> {
        let events = self.remove_node_internal(node_id)?;
        self.emit_changed(events);
        Ok(())
    }

    fn remove_node_internal(&mut self, node_id: NodeId) -> Result<Vec<SimEvent>, SimError> {
        let node = self
            .state
            .nodes
            .remove(&node_id)
            .ok_or(SimError::NodeNotFound(node_id))?;

        let mut events = Vec::new();
        for path_id in &node.path_ids {
            if self.drop_path(*path_id) {
                events.push(SimEvent::PathRemoved(*path_id));
            }
        }
        for vehicle_id in &node.fleet {
            self.state.vehicles.remove(vehicle_id);
            self.routes.cancel_for_vehicle(*vehicle_id);
        }
        self.network.remove_node(node_id);

        info!(
            "Node {} removed with {} paths and {} docked vehicles",
            node_id,
            node.path_ids.len(),
            node.fleet.len()
        );
        events.push(SimEvent::NodeRemoved(node_id));
        Ok(events)
    }

    pub fn remove_selected_nodes(&mut self) -> Vec<NodeId> {
        let selected: Vec<NodeId> = self
            .state
            .nodes
            .values()
            .filter(|node| node.selected)
            .map(|node| node.id)
            .collect();

        let mut events = Vec::new();
        for node_id in &selected {
            if let Ok(removed) = self.remove_node_internal(*node_id) {
                events.extend(removed);
            }
        }
        self.emit_changed(events);
        selected
    }

    pub fn move_node(&mut self, node_id: NodeId, position: GeoPoint) -> Result<(), SimError> {
        let node = self
            .state
            .nodes
            .get_mut(&node_id)
            .ok_or(SimError::NodeNotFound(node_id))?;
        node.position = position;
        self.network.move_node(node_id, position);
        self.emit_changed(vec![SimEvent::NodeMoved(node_id)]);
        Ok(())
    }

    pub fn edit_node(&mut self, node_id: NodeId, edit: NodeEdit) -> Result<(), SimError> {
        let node = self
            .state
            .nodes
            .get_mut(&node_id)
            .ok_or(SimError::NodeNotFound(node_id))?;
        let dropped = node.apply_edit(edit)?;
        if dropped > 0 {
            info!("Node {} dropped {} units after a capacity edit", node_id, dropped);
            self.state.economy.record_discard(dropped);
        }
        self.emit_changed(vec![SimEvent::NodeChanged(node_id)]);
        Ok(())
    }

    /// Put items straight into a node's inventory. Returns what fit.
    pub fn deposit_items(&mut self, node_id: NodeId, items: &ItemSet) -> Result<ItemSet, SimError> {
        let node = self
            .state
            .nodes
            .get_mut(&node_id)
            .ok_or(SimError::NodeNotFound(node_id))?;
        let stored = node.inventory.store(items);
        let discarded = item_total(items) - item_total(&stored);
        if discarded > 0 {
            self.state.economy.record_discard(discarded);
        }
        self.emit_changed(vec![SimEvent::NodeChanged(node_id)]);
        Ok(stored)
    }

    /// Change the kind of every selected node. Inventory that no longer fits
    /// is dropped, and new sources get a vehicle if they have none.
    pub fn change_selected_nodes_kind(&mut self, kind: NodeKind) -> Vec<NodeId> {
        let now = self.state.now_ms;
        let mut changed = Vec::new();
        let mut events = Vec::new();

        for node in self.state.nodes.values_mut().filter(|node| node.selected) {
            let dropped = node.set_kind(kind, now);
            if dropped > 0 {
                self.state.economy.record_discard(dropped);
            }
            changed.push(node.id);
            events.push(SimEvent::NodeKindChanged {
                node: node.id,
                kind,
            });
        }

        if kind == NodeKind::Source {
            for node_id in &changed {
                let needs_vehicle = self
                    .state
                    .nodes
                    .get(node_id)
                    .is_some_and(|node| node.fleet.is_empty());
                if needs_vehicle {
                    events.extend(self.spawn_docked_vehicle(*node_id, VehicleKind::Moto));
                }
            }
        }

        self.emit_changed(events);
        changed
    }

    /// Closest node within `threshold_m` of `point`, or the configured default
    /// threshold when `None`
    pub fn find_node_at(&self, point: GeoPoint, threshold_m: Option<f64>) -> Option<NodeId> {
        let threshold = threshold_m.unwrap_or(self.config.node_lookup_threshold_m);
        self.state
            .nodes
            .values()
            .map(|node| (node.id, node.position.distance_m(&point)))
            .filter(|(_, distance)| *distance <= threshold)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /* ------------------------------------------------------------------ */
    /* Paths                                                              */
    /* ------------------------------------------------------------------ */

    fn check_connection(&self, from: NodeId, to: NodeId) -> Result<(), SimError> {
        if from == to {
            return Err(SimError::SelfConnection { node: from });
        }
        let a = self
            .state
            .nodes
            .get(&from)
            .ok_or(SimError::NodeNotFound(from))?;
        let b = self
            .state
            .nodes
            .get(&to)
            .ok_or(SimError::NodeNotFound(to))?;
        if !a.kind().can_connect(b.kind()) {
            return Err(SimError::ConnectionNotAllowed {
                from: a.kind(),
                to: b.kind(),
            });
        }
        Ok(())
    }

    /// Existing permanent path between two nodes, either direction
    pub fn path_between(&self, a: NodeId, b: NodeId) -> Option<PathId> {
        self.state
            .nodes
            .get(&a)?
            .path_ids
            .iter()
            .copied()
            .find(|id| self.state.paths.get(id).is_some_and(|path| path.connects(a, b)))
    }

    fn insert_path(&mut self, from: NodeId, to: NodeId, route: RouteData) -> Result<PathId, SimError> {
        self.check_connection(from, to)?;
        if let Some(existing) = self.path_between(from, to) {
            return Ok(existing);
        }

        let path_id = self.state.ids.path();
        let path = Path::new(path_id, PathEnd::Node(from), PathEnd::Node(to), route, false);
        self.network.add_path(&path);
        self.state.paths.insert(path_id, path);
        for node_id in [from, to] {
            if let Some(node) = self.state.nodes.get_mut(&node_id) {
                node.path_ids.insert(path_id);
            }
        }
        Ok(path_id)
    }

    /// Connect two nodes with the given geometry, right away
    pub fn add_path(&mut self, from: NodeId, to: NodeId, route: RouteData) -> Result<PathId, SimError> {
        let path_id = self.insert_path(from, to, route)?;
        self.emit_changed(vec![SimEvent::PathAdded(path_id)]);
        Ok(path_id)
    }

    /// Connect two nodes along a routed path. The path appears once the route
    /// is resolved on a later tick.
    pub fn request_path(&mut self, from: NodeId, to: NodeId) -> Result<(), SimError> {
        self.check_connection(from, to)?;
        let (a, b) = (
            self.state.nodes[&from].position,
            self.state.nodes[&to].position,
        );
        self.routes
            .submit(a, b, RoutePurpose::UserPath { from, to }, self.state.tick);
        Ok(())
    }

    /// Remove a path from the registries and the network. False if unknown.
    fn drop_path(&mut self, path_id: PathId) -> bool {
        let Some(path) = self.state.paths.remove(&path_id) else {
            return false;
        };
        for node_id in [path.start.node(), path.end.node()].into_iter().flatten() {
            if let Some(node) = self.state.nodes.get_mut(&node_id) {
                node.path_ids.remove(&path_id);
            }
        }
        self.network.remove_path(path_id);
        true
    }

    pub fn remove_path(&mut self, path_id: PathId) -> Result<(), SimError> {
        if !self.drop_path(path_id) {
            return Err(SimError::PathNotFound(path_id));
        }
        self.emit_changed(vec![SimEvent::PathRemoved(path_id)]);
        Ok(())
    }

    /// Remove the path joining two nodes, if any. Returns its id.
    pub fn remove_path_between(&mut self, a: NodeId, b: NodeId) -> Option<PathId> {
        let path_id = self.path_between(a, b)?;
        self.remove_path(path_id).ok()?;
        Some(path_id)
    }

    /* ------------------------------------------------------------------ */
    /* Selection and production                                           */
    /* ------------------------------------------------------------------ */

    /// Flip a node's selection. Without `additive`, everything else is
    /// deselected first.
    pub fn toggle_node_selection(&mut self, node_id: NodeId, additive: bool) -> Result<(), SimError> {
        if !self.state.nodes.contains_key(&node_id) {
            return Err(SimError::NodeNotFound(node_id));
        }
        if !additive {
            for node in self.state.nodes.values_mut().filter(|n| n.id != node_id) {
                node.selected = false;
            }
        }
        if let Some(node) = self.state.nodes.get_mut(&node_id) {
            node.selected = !node.selected;
        }
        self.emit_changed(vec![SimEvent::SelectionChanged]);
        Ok(())
    }

    pub fn toggle_vehicle_selection(
        &mut self,
        vehicle_id: VehicleId,
        additive: bool,
    ) -> Result<(), SimError> {
        if !self.state.vehicles.contains_key(&vehicle_id) {
            return Err(SimError::VehicleNotFound(vehicle_id));
        }
        if !additive {
            self.deselect_all_except(Some(vehicle_id));
        }
        if let Some(vehicle) = self.state.vehicles.get_mut(&vehicle_id) {
            vehicle.selected = !vehicle.selected;
        }
        self.emit_changed(vec![SimEvent::SelectionChanged]);
        Ok(())
    }

    fn deselect_all_except(&mut self, keep: Option<VehicleId>) -> bool {
        let mut changed = false;
        for node in self.state.nodes.values_mut().filter(|n| n.selected) {
            node.selected = false;
            changed = true;
        }
        for vehicle in self
            .state
            .vehicles
            .values_mut()
            .filter(|v| v.selected && Some(v.id) != keep)
        {
            vehicle.selected = false;
            changed = true;
        }
        changed
    }

    pub fn clear_selections(&mut self) {
        if self.deselect_all_except(None) {
            self.emit(SimEvent::SelectionChanged);
        }
    }

    pub fn toggle_production(&mut self) -> bool {
        self.state.production_active = !self.state.production_active;
        let active = self.state.production_active;
        info!("Production {}", if active { "resumed" } else { "paused" });
        self.emit_changed(vec![SimEvent::ProductionToggled(active)]);
        active
    }

    /* ------------------------------------------------------------------ */
    /* Orders and vehicles                                                */
    /* ------------------------------------------------------------------ */

    /// Ask `provider` to send `items` to `requester`. The order waits as
    /// Pending until the dispatch pass finds stock and a vehicle.
    pub fn create_order(
        &mut self,
        requester: NodeId,
        provider: NodeId,
        items: ItemSet,
    ) -> Result<OrderId, SimError> {
        if item_total(&items) == 0 {
            return Err(SimError::EmptyOrder);
        }
        for node_id in [requester, provider] {
            if !self.state.nodes.contains_key(&node_id) {
                return Err(SimError::NodeNotFound(node_id));
            }
        }

        let id = self.state.ids.order();
        let order = Order::new(id, requester, provider, items, self.state.now_ms);
        info!(
            "Order {} created: {} asks {} for {} units",
            id,
            requester,
            provider,
            order.total_items()
        );
        self.state.orders.insert(id, order);
        self.emit_changed(vec![SimEvent::OrderCreated(id)]);
        Ok(id)
    }

    pub fn order_status(&self, order_id: OrderId) -> Option<OrderStatus> {
        self.state.orders.get(&order_id).map(|order| order.status)
    }

    /// Add a vehicle to a node's fleet
    pub fn add_vehicle(&mut self, node_id: NodeId, kind: VehicleKind) -> Result<VehicleId, SimError> {
        if !self.state.nodes.contains_key(&node_id) {
            return Err(SimError::NodeNotFound(node_id));
        }
        let events = self.spawn_docked_vehicle(node_id, kind);
        let vehicle_id = events
            .iter()
            .find_map(|event| match event {
                SimEvent::VehicleAdded(id) => Some(*id),
                _ => None,
            })
            .ok_or(SimError::NodeNotFound(node_id))?;
        self.emit_changed(events);
        Ok(vehicle_id)
    }

    fn free_vehicle(&self, vehicle_id: VehicleId) -> Result<GeoPoint, SimError> {
        let vehicle = self
            .state
            .vehicles
            .get(&vehicle_id)
            .ok_or(SimError::VehicleNotFound(vehicle_id))?;
        if vehicle.status != VehicleStatus::Free {
            return Err(SimError::InvalidVehicleStatus {
                vehicle: vehicle_id,
                expected: VehicleStatus::Free,
                actual: vehicle.status,
            });
        }
        if vehicle.pending_route.is_some() {
            return Err(SimError::VehicleBusy(vehicle_id));
        }
        Ok(vehicle.position.unwrap_or_default())
    }

    /// Send a free vehicle to dock at a node
    pub fn assign_vehicle_to_node(
        &mut self,
        vehicle_id: VehicleId,
        node_id: NodeId,
    ) -> Result<(), SimError> {
        let from = self.free_vehicle(vehicle_id)?;
        let to = self
            .state
            .nodes
            .get(&node_id)
            .ok_or(SimError::NodeNotFound(node_id))?
            .position;
        let ticket = self.routes.submit(
            from,
            to,
            RoutePurpose::Assign {
                vehicle: vehicle_id,
                node: node_id,
            },
            self.state.tick,
        );
        if let Some(vehicle) = self.state.vehicles.get_mut(&vehicle_id) {
            vehicle.pending_route = Some(ticket);
        }
        self.emit(SimEvent::StateChanged);
        Ok(())
    }

    /// Send a free vehicle to a point on the map
    pub fn move_free_vehicle(&mut self, vehicle_id: VehicleId, target: GeoPoint) -> Result<(), SimError> {
        let from = self.free_vehicle(vehicle_id)?;
        let ticket = self.routes.submit(
            from,
            target,
            RoutePurpose::Move {
                vehicle: vehicle_id,
                target,
            },
            self.state.tick,
        );
        if let Some(vehicle) = self.state.vehicles.get_mut(&vehicle_id) {
            vehicle.pending_route = Some(ticket);
        }
        self.emit(SimEvent::StateChanged);
        Ok(())
    }

    /// Kick a docked vehicle out of its node. It lands at a random point on a
    /// small circle around the node, free and homeless.
    pub fn expel_vehicle(&mut self, vehicle_id: VehicleId) -> Result<GeoPoint, SimError> {
        let vehicle = self
            .state
            .vehicles
            .get(&vehicle_id)
            .ok_or(SimError::VehicleNotFound(vehicle_id))?;
        if vehicle.status != VehicleStatus::Docked {
            return Err(SimError::InvalidVehicleStatus {
                vehicle: vehicle_id,
                expected: VehicleStatus::Docked,
                actual: vehicle.status,
            });
        }
        if vehicle.pending_route.is_some() {
            return Err(SimError::VehicleBusy(vehicle_id));
        }

        let center = vehicle
            .home_node
            .and_then(|home| self.state.nodes.get(&home))
            .map(|node| node.position)
            .unwrap_or_default();
        let angle = self.rng.random_range(0.0..TAU);
        let at = center.offset_m(self.config.expel_radius_m, angle);

        let events = release_vehicle(&mut self.state, vehicle_id, at);
        info!("Vehicle {} expelled to {}", vehicle_id, at);
        self.emit_changed(events);
        Ok(at)
    }

    /// Dock a free vehicle at a node on the spot, without driving there
    pub fn dock_free_vehicle(&mut self, vehicle_id: VehicleId, node_id: NodeId) -> Result<(), SimError> {
        self.free_vehicle(vehicle_id)?;
        if !self.state.nodes.contains_key(&node_id) {
            return Err(SimError::NodeNotFound(node_id));
        }
        let events = dock_vehicle(&mut self.state, vehicle_id, node_id);
        self.emit_changed(events);
        Ok(())
    }

    /* ------------------------------------------------------------------ */
    /* Whole-world operations                                             */
    /* ------------------------------------------------------------------ */

    pub fn export_state(&self) -> SaveData {
        SaveData::capture(&self.state, &self.routes)
    }

    /// Replace the whole world with saved data
    pub fn import_state(&mut self, data: SaveData) {
        let (state, requests) = data.into_state();
        self.state = state;
        self.routes.restore(requests);
        self.network = PathNetwork::rebuild(self.state.nodes.values(), self.state.paths.values());
        info!(
            "Imported {} nodes, {} paths, {} vehicles",
            self.state.nodes.len(),
            self.state.paths.len(),
            self.state.vehicles.len()
        );
        self.emit_changed(vec![SimEvent::StateImported]);
    }

    pub fn import_json(&mut self, json: &str) -> Result<(), PersistenceError> {
        let data = SaveData::from_json(json)?;
        self.import_state(data);
        Ok(())
    }

    /// Empty the world and reset money to the configured reset amount
    pub fn clear_all(&mut self) {
        self.state = SimState::new(self.config.reset_money, false);
        self.routes.clear();
        self.network = PathNetwork::new();
        warn!("World cleared");
        self.emit_changed(vec![
            SimEvent::StateCleared,
            SimEvent::MoneyChanged(self.config.reset_money),
        ]);
    }

    /// Build a small demo network: a source feeding a warehouse that
    /// supplies two stores, with a transformer on the side
    pub fn build_demo_world(mut world: SimWorld) -> Self {
        let origin = GeoPoint::new(-33.45, -70.66);
        let at = |north: f64, east: f64| {
            origin
                .offset_m(north, 0.0)
                .offset_m(east, std::f64::consts::FRAC_PI_2)
        };

        let source = world.add_node(at(0.0, -600.0), NodeKind::Source);
        let warehouse = world.add_node(at(0.0, 0.0), NodeKind::Warehouse);
        let transformer = world.add_node(at(400.0, 0.0), NodeKind::Transformer);
        let store_east = world.add_node(at(0.0, 700.0), NodeKind::Store);
        let store_south = world.add_node(at(-700.0, 0.0), NodeKind::Store);

        for (from, to) in [
            (source, warehouse),
            (warehouse, transformer),
            (store_east, warehouse),
            (store_south, warehouse),
        ] {
            let route = RouteData::straight_line(
                world.state.nodes[&from].position,
                world.state.nodes[&to].position,
            );
            if let Err(err) = world.add_path(from, to, route) {
                warn!("Demo path {} -> {} skipped: {}", from, to, err);
            }
        }

        for _ in 0..2 {
            if let Err(err) = world.add_vehicle(warehouse, VehicleKind::Van) {
                warn!("Demo van skipped: {}", err);
            }
        }
        if let Err(err) = world.edit_node(source, NodeEdit::ProductionInterval(250.0)) {
            warn!("Demo production interval not set: {}", err);
        }
        for (requester, provider, order) in [
            (warehouse, source, items([("A", 5)])),
            (store_east, warehouse, items([("A", 3)])),
        ] {
            if let Err(err) = world.create_order(requester, provider, order) {
                warn!("Demo order {} <- {} skipped: {}", requester, provider, err);
            }
        }

        world
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== Logistics Simulation Summary ===");
        println!("Time: {:.1}s (tick {})", self.state.now_ms / 1000.0, self.state.tick);
        println!(
            "Nodes: {}, Paths: {}, Vehicles: {}, Clients: {}, Orders: {}",
            self.state.nodes.len(),
            self.state.paths.len(),
            self.state.vehicles.len(),
            self.state.clients.len(),
            self.state.orders.len()
        );
        println!("Pending routes: {}", self.routes.len());
        println!(
            "Production: {}",
            if self.state.production_active { "on" } else { "off" }
        );
        println!();

        println!("--- Nodes ---");
        for node in self.state.nodes.values() {
            let stock: Vec<String> = node
                .inventory
                .items()
                .iter()
                .map(|(kind, count)| format!("{}={}", kind, count))
                .collect();
            println!(
                "  {} {} {:?}: stock [{}] {}/{}, fleet={}",
                node.kind().symbol(),
                node.id,
                node.kind(),
                stock.join(", "),
                node.inventory.total(),
                node.inventory
                    .capacity()
                    .map_or("inf".to_string(), |c| c.to_string()),
                node.fleet.len()
            );
        }

        if !self.state.orders.is_empty() {
            println!("--- Orders ---");
            for order in self.state.orders.values() {
                println!(
                    "  Order {}: {} -> {}, {} units, {:?}",
                    order.id,
                    order.provider,
                    order.requester,
                    order.total_items(),
                    order.status
                );
            }
        }

        let moving: Vec<&SimVehicle> = self
            .state
            .vehicles
            .values()
            .filter(|v| v.status != VehicleStatus::Docked)
            .collect();
        if !moving.is_empty() {
            println!("--- Vehicles on the map ---");
            for vehicle in moving {
                println!(
                    "  Vehicle {} {:?}: {:?}, cargo {}/{}, at {}",
                    vehicle.id,
                    vehicle.kind,
                    vehicle.status,
                    vehicle.cargo_total(),
                    vehicle.capacity,
                    vehicle.position.unwrap_or_default()
                );
            }
        }

        println!("--- Economy ---");
        println!("  {}", self.state.economy.summary());
    }
}
