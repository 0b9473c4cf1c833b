//! Vehicle movement and mission bookkeeping
//!
//! Moving vehicles along their temporary paths, starting missions once a
//! route is ready, and settling what happens on arrival. Separate from the
//! world so the tick just calls in and collects events.

use log::{debug, info, warn};

use super::events::SimEvent;
use super::order::OrderStatus;
use super::path::{Path, PathEnd, RouteData};
use super::routing::{RoutePurpose, RouteQueue};
use super::state::SimState;
use super::types::{item_total, GeoPoint, NodeId, OrderId, PathId, VehicleId};
use super::vehicle::{Mission, MissionKind, MissionTarget, VehicleStatus, VehicleUpdateResult};

/// Put a vehicle on a fresh temporary path built from `route`.
/// Returns the new path id, or `None` if the vehicle is gone.
pub fn launch_on_route(
    state: &mut SimState,
    vehicle_id: VehicleId,
    start: PathEnd,
    end: PathEnd,
    route: RouteData,
    mission: Mission,
) -> Option<(PathId, Vec<SimEvent>)> {
    if !state.vehicles.contains_key(&vehicle_id) {
        return None;
    }

    let path_id = state.ids.path();
    let path = Path::new(path_id, start, end, route, true);
    let Some(start_point) = path.first_point() else {
        warn!("Route for vehicle {} has no geometry", vehicle_id);
        return None;
    };
    state.paths.insert(path_id, path);

    let vehicle = state.vehicles.get_mut(&vehicle_id)?;
    vehicle.launch(path_id, start_point, mission);
    debug!(
        "Vehicle {} launched on {:?} mission along path {}",
        vehicle_id, mission.kind, path_id
    );

    let events = vec![
        SimEvent::PathAdded(path_id),
        SimEvent::VehicleLaunched {
            vehicle: vehicle_id,
            mission: mission.kind,
            path: path_id,
        },
    ];
    Some((path_id, events))
}

/// Move every vehicle on a mission and settle the ones that arrived
pub fn update_vehicles(
    state: &mut SimState,
    routes: &mut RouteQueue,
    delta_ms: f64,
) -> Vec<SimEvent> {
    let mut events = Vec::new();

    // Collect ids up front; settling mutates the registries
    let moving: Vec<VehicleId> = state
        .vehicles
        .values()
        .filter(|vehicle| vehicle.status == VehicleStatus::OnMission)
        .map(|vehicle| vehicle.id)
        .collect();

    for vehicle_id in moving {
        let SimState {
            vehicles, paths, ..
        } = &mut *state;
        let Some(vehicle) = vehicles.get_mut(&vehicle_id) else {
            continue;
        };

        let result = match vehicle.path_id.and_then(|id| paths.get(&id)) {
            Some(path) => vehicle.advance(delta_ms, path),
            None => {
                let at = vehicle.position.unwrap_or_default();
                let returning = vehicle
                    .mission
                    .filter(|mission| mission.kind == MissionKind::Return)
                    .and_then(|mission| mission.order);
                warn!("Vehicle {} lost its path; releasing it at {}", vehicle_id, at);
                vehicle.release(at);
                events.push(SimEvent::VehicleReleased {
                    vehicle: vehicle_id,
                    at,
                });
                events.extend(close_returned_order(state, returning));
                continue;
            }
        };

        if let VehicleUpdateResult::Arrived(point) = result {
            events.extend(settle_arrival(state, routes, vehicle_id, point));
        }
    }

    events
}

/// Resolve a finished trip: drop off cargo, dock, or go free
fn settle_arrival(
    state: &mut SimState,
    routes: &mut RouteQueue,
    vehicle_id: VehicleId,
    point: GeoPoint,
) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let Some(vehicle) = state.vehicles.get(&vehicle_id) else {
        return events;
    };
    let mission = vehicle.mission;
    let finished_path = vehicle.path_id;

    if let Some(path_id) = finished_path {
        if state.paths.get(&path_id).is_some_and(|path| path.temporary) {
            state.paths.remove(&path_id);
            events.push(SimEvent::PathRemoved(path_id));
        }
    }

    let Some(mission) = mission else {
        events.extend(release_vehicle(state, vehicle_id, point));
        return events;
    };

    match mission.kind {
        MissionKind::Deliver => {
            events.extend(settle_delivery(state, routes, vehicle_id, mission, point));
        }
        MissionKind::Return | MissionKind::Assign => {
            match mission.target_node() {
                Some(node_id) if state.nodes.contains_key(&node_id) => {
                    events.extend(dock_vehicle(state, vehicle_id, node_id));
                }
                _ => {
                    debug!("Vehicle {} arrived at a node that no longer exists", vehicle_id);
                    events.extend(release_vehicle(state, vehicle_id, point));
                }
            }
            if mission.kind == MissionKind::Return {
                events.extend(close_returned_order(state, mission.order));
            }
        }
        MissionKind::Move => {
            let at = match mission.target {
                MissionTarget::Point(target) => target,
                MissionTarget::Node(_) => point,
            };
            events.extend(release_vehicle(state, vehicle_id, at));
        }
    }

    events
}

/// Unload at the requester, complete the order, then head home
fn settle_delivery(
    state: &mut SimState,
    routes: &mut RouteQueue,
    vehicle_id: VehicleId,
    mission: Mission,
    point: GeoPoint,
) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let requester = mission.target_node();

    let delivered = match requester.filter(|id| state.nodes.contains_key(id)) {
        Some(node_id) => {
            let cargo = state
                .vehicles
                .get_mut(&vehicle_id)
                .map(|vehicle| vehicle.unload_all())
                .unwrap_or_default();
            if let Some(node) = state.nodes.get_mut(&node_id) {
                let stored = node.inventory.store(&cargo);
                let discarded = item_total(&cargo) - item_total(&stored);
                if discarded > 0 {
                    info!(
                        "Node {} had no room for {} delivered units; discarding them",
                        node_id, discarded
                    );
                    state.economy.record_discard(discarded);
                }
            }
            state.economy.record_delivery();
            events.push(SimEvent::NodeChanged(node_id));
            true
        }
        None => false,
    };

    if let Some(order_id) = mission.order {
        let next = if delivered {
            OrderStatus::Completed
        } else {
            OrderStatus::Returning
        };
        events.extend(advance_order(state, order_id, next));
    }

    let returning = mission.order.filter(|_| !delivered);
    events.extend(send_home(state, routes, vehicle_id, requester, returning, point));
    events
}

/// Queue a return trip to the home node, or let the vehicle go free
fn send_home(
    state: &mut SimState,
    routes: &mut RouteQueue,
    vehicle_id: VehicleId,
    origin: Option<NodeId>,
    returning: Option<OrderId>,
    point: GeoPoint,
) -> Vec<SimEvent> {
    let home = state
        .vehicles
        .get(&vehicle_id)
        .and_then(|vehicle| vehicle.home_node)
        .and_then(|home| state.nodes.get(&home))
        .map(|node| (node.id, node.position));

    let Some((home, home_position)) = home else {
        let mut events = release_vehicle(state, vehicle_id, point);
        events.extend(close_returned_order(state, returning));
        return events;
    };

    let ticket = routes.submit(
        point,
        home_position,
        RoutePurpose::Return {
            order: returning,
            vehicle: vehicle_id,
            origin,
            home,
        },
        state.tick,
    );
    if let Some(vehicle) = state.vehicles.get_mut(&vehicle_id) {
        vehicle.hold(point, ticket);
    }
    Vec::new()
}

/// Dock at a node: join its fleet and hand over whatever is still on board
pub fn dock_vehicle(state: &mut SimState, vehicle_id: VehicleId, node_id: NodeId) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let Some(vehicle) = state.vehicles.get_mut(&vehicle_id) else {
        return events;
    };
    let Some(node) = state.nodes.get_mut(&node_id) else {
        return events;
    };

    let residual = vehicle.unload_all();
    if !residual.is_empty() {
        let stored = node.inventory.store(&residual);
        let discarded = item_total(&residual) - item_total(&stored);
        if discarded > 0 {
            state.economy.record_discard(discarded);
        }
        events.push(SimEvent::NodeChanged(node_id));
    }

    vehicle.dock(node_id);
    node.add_to_fleet(vehicle_id);
    debug!("Vehicle {} docked at node {}", vehicle_id, node_id);
    events.push(SimEvent::VehicleDocked {
        vehicle: vehicle_id,
        node: node_id,
    });
    events
}

/// Leave a vehicle free at `at`, with no home
pub fn release_vehicle(state: &mut SimState, vehicle_id: VehicleId, at: GeoPoint) -> Vec<SimEvent> {
    let Some(vehicle) = state.vehicles.get_mut(&vehicle_id) else {
        return Vec::new();
    };
    if let Some(home) = vehicle.home_node {
        if let Some(node) = state.nodes.get_mut(&home) {
            node.remove_from_fleet(vehicle_id);
        }
    }
    vehicle.release(at);
    vec![SimEvent::VehicleReleased {
        vehicle: vehicle_id,
        at,
    }]
}

/// A return trip is over, whether the goods made it home or not
pub fn close_returned_order(state: &mut SimState, order: Option<OrderId>) -> Vec<SimEvent> {
    match order {
        Some(order_id) => advance_order(state, order_id, OrderStatus::Completed),
        None => Vec::new(),
    }
}

pub fn advance_order(state: &mut SimState, order_id: OrderId, next: OrderStatus) -> Vec<SimEvent> {
    let Some(order) = state.orders.get_mut(&order_id) else {
        return Vec::new();
    };
    match order.advance(next) {
        Ok(from) => {
            debug!("Order {}: {:?} -> {:?}", order_id, from, next);
            vec![SimEvent::OrderStatusChanged {
                order: order_id,
                from,
                to: next,
            }]
        }
        Err(err) => {
            warn!("{}", err);
            Vec::new()
        }
    }
}
