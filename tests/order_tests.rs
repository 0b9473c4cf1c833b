//! Order dispatch and the delivery round trip

use logistics_sim::simulation::{
    items, GeoPoint, ItemSet, MissionKind, NodeEdit, NodeId, NodeKind, OrderStatus, ResourceKind,
    SimError, SimEvent, SimId, SimWorld, StraightLineRouter, VehicleId, VehicleKind, VehicleStatus,
};

fn origin() -> GeoPoint {
    GeoPoint::new(-33.45, -70.66)
}

fn run_ticks(world: &mut SimWorld, ticks: u32, delta_ms: f64) {
    for _ in 0..ticks {
        world.tick(delta_ms);
    }
}

/// Two warehouses 1km apart, the provider owning one vehicle of `kind`
fn two_warehouses(kind: VehicleKind) -> (SimWorld, NodeId, NodeId, VehicleId) {
    let mut world = SimWorld::new_with_seed(7).with_router(Box::new(StraightLineRouter));
    let provider = world.add_node(origin(), NodeKind::Warehouse);
    let requester = world.add_node(origin().offset_m(1000.0, 0.0), NodeKind::Warehouse);
    let vehicle = world.add_vehicle(provider, kind).unwrap();
    (world, provider, requester, vehicle)
}

#[test]
fn test_order_waits_for_stock() {
    let (mut world, provider, requester, _) = two_warehouses(VehicleKind::Van);
    world.deposit_items(provider, &items([("A", 2)])).unwrap();
    let order = world
        .create_order(requester, provider, items([("A", 3)]))
        .unwrap();

    run_ticks(&mut world, 100, 100.0);
    assert_eq!(world.order_status(order), Some(OrderStatus::Pending));
    assert_eq!(
        world.state().nodes[&provider]
            .inventory
            .count(&ResourceKind::new("A")),
        2
    );

    world.deposit_items(provider, &items([("A", 1)])).unwrap();
    world.tick(100.0);
    assert_eq!(world.order_status(order), Some(OrderStatus::EnRoute));
    assert_eq!(world.state().nodes[&provider].inventory.total(), 0);
}

#[test]
fn test_order_waits_for_vehicle_capacity() {
    let (mut world, provider, requester, _) = two_warehouses(VehicleKind::Moto);
    world.deposit_items(provider, &items([("A", 10)])).unwrap();
    let order = world
        .create_order(requester, provider, items([("A", 6)]))
        .unwrap();

    run_ticks(&mut world, 10, 100.0);
    assert_eq!(world.order_status(order), Some(OrderStatus::Pending));

    world.add_vehicle(provider, VehicleKind::Van).unwrap();
    world.tick(100.0);
    assert_eq!(world.order_status(order), Some(OrderStatus::EnRoute));
}

#[test]
fn test_dispatch_loads_vehicle_and_leaves_fleet() {
    let (mut world, provider, requester, vehicle) = two_warehouses(VehicleKind::Van);
    world.deposit_items(provider, &items([("A", 4), ("B", 1)])).unwrap();
    let order = world
        .create_order(requester, provider, items([("A", 3)]))
        .unwrap();

    world.dispatch_orders();

    let van = &world.state().vehicles[&vehicle];
    assert_eq!(van.cargo_total(), 3);
    assert!(van.pending_route.is_some());
    assert!(!world.state().nodes[&provider].fleet.contains(&vehicle));
    assert_eq!(world.state().orders[&order].assigned_vehicle, Some(vehicle));

    let remaining = &world.state().nodes[&provider].inventory;
    assert_eq!(remaining.count(&ResourceKind::new("A")), 1);
    assert_eq!(remaining.count(&ResourceKind::new("B")), 1);
}

#[test]
fn test_dispatch_is_idempotent() {
    let (mut world, provider, requester, _) = two_warehouses(VehicleKind::Van);
    world.add_vehicle(provider, VehicleKind::Van).unwrap();
    world.deposit_items(provider, &items([("A", 10)])).unwrap();
    world
        .create_order(requester, provider, items([("A", 3)]))
        .unwrap();
    world.drain_events();

    world.dispatch_orders();
    world.dispatch_orders();

    let dispatched = world
        .drain_events()
        .into_iter()
        .filter(|event| matches!(event, SimEvent::OrderStatusChanged { .. }))
        .count();
    assert_eq!(dispatched, 1);
    assert_eq!(world.pending_routes(), 1);
    assert_eq!(world.state().nodes[&provider].inventory.total(), 7);
    assert_eq!(world.state().nodes[&provider].fleet.len(), 1);
}

#[test]
fn test_first_fleet_vehicle_wins() {
    let (mut world, provider, requester, first) = two_warehouses(VehicleKind::Van);
    let second = world.add_vehicle(provider, VehicleKind::Van).unwrap();
    world.deposit_items(provider, &items([("A", 1)])).unwrap();
    let order = world
        .create_order(requester, provider, items([("A", 1)]))
        .unwrap();

    world.dispatch_orders();

    assert_eq!(world.state().orders[&order].assigned_vehicle, Some(first));
    assert_eq!(world.state().nodes[&provider].fleet, vec![second]);
}

#[test]
fn test_order_rejected_when_provider_removed() {
    let (mut world, provider, requester, _) = two_warehouses(VehicleKind::Van);
    let order = world
        .create_order(requester, provider, items([("A", 3)]))
        .unwrap();

    world.remove_node(provider).unwrap();
    world.tick(100.0);

    assert_eq!(world.order_status(order), Some(OrderStatus::Rejected));
    assert_eq!(world.state().economy.orders_rejected, 1);

    // Rejected is final
    run_ticks(&mut world, 5, 100.0);
    assert_eq!(world.order_status(order), Some(OrderStatus::Rejected));
}

#[test]
fn test_create_order_validation() {
    let (mut world, provider, requester, _) = two_warehouses(VehicleKind::Van);

    assert!(matches!(
        world.create_order(requester, provider, ItemSet::new()),
        Err(SimError::EmptyOrder)
    ));
    assert!(matches!(
        world.create_order(requester, provider, items([("A", 0)])),
        Err(SimError::EmptyOrder)
    ));

    let missing = NodeId(SimId(999));
    assert!(matches!(
        world.create_order(requester, missing, items([("A", 1)])),
        Err(SimError::NodeNotFound(id)) if id == missing
    ));
}

#[test]
fn test_delivery_overflow_is_discarded_and_vehicle_returns() {
    let (mut world, provider, requester, vehicle) = two_warehouses(VehicleKind::Moto);
    world
        .edit_node(requester, NodeEdit::InventoryCapacity(Some(3)))
        .unwrap();
    world.deposit_items(provider, &items([("A", 5)])).unwrap();
    let order = world
        .create_order(requester, provider, items([("A", 5)]))
        .unwrap();
    world.drain_events();

    // 1km at 1600km/h is ~2.25s each way; 20s is plenty
    run_ticks(&mut world, 200, 100.0);

    assert_eq!(world.order_status(order), Some(OrderStatus::Completed));
    assert_eq!(world.state().nodes[&requester].inventory.total(), 3);
    assert_eq!(world.state().economy.units_discarded, 2);
    assert_eq!(world.state().economy.deliveries_completed, 1);

    let moto = &world.state().vehicles[&vehicle];
    assert_eq!(moto.status, VehicleStatus::Docked);
    assert_eq!(moto.home_node, Some(provider));
    assert_eq!(moto.cargo_total(), 0);
    assert!(moto.path_id.is_none());
    assert!(world.state().nodes[&provider].fleet.contains(&vehicle));

    let events = world.drain_events();
    let missions: Vec<MissionKind> = events
        .iter()
        .filter_map(|event| match event {
            SimEvent::VehicleLaunched { vehicle: v, mission, .. } if *v == vehicle => {
                Some(*mission)
            }
            _ => None,
        })
        .collect();
    assert_eq!(missions, vec![MissionKind::Deliver, MissionKind::Return]);

    // Temporary paths are gone once both trips are over
    assert!(world.state().paths.is_empty());
}

#[test]
fn test_order_status_only_moves_forward() {
    let (mut world, provider, requester, _) = two_warehouses(VehicleKind::Van);
    world.deposit_items(provider, &items([("A", 5)])).unwrap();
    let order = world
        .create_order(requester, provider, items([("A", 5)]))
        .unwrap();
    world.drain_events();

    run_ticks(&mut world, 200, 100.0);

    let transitions: Vec<(OrderStatus, OrderStatus)> = world
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            SimEvent::OrderStatusChanged { order: o, from, to } if o == order => Some((from, to)),
            _ => None,
        })
        .collect();

    assert_eq!(
        transitions,
        vec![
            (OrderStatus::Pending, OrderStatus::EnRoute),
            (OrderStatus::EnRoute, OrderStatus::Delivering),
            (OrderStatus::Delivering, OrderStatus::Completed),
        ]
    );
}

#[test]
fn test_vehicle_waits_docked_until_route_resolves() {
    let (mut world, provider, requester, vehicle) = two_warehouses(VehicleKind::Van);
    world.deposit_items(provider, &items([("A", 1)])).unwrap();
    let order = world
        .create_order(requester, provider, items([("A", 1)]))
        .unwrap();

    // Dispatched on tick 1, route applied on tick 2
    world.tick(100.0);
    let van = &world.state().vehicles[&vehicle];
    assert_eq!(van.status, VehicleStatus::Docked);
    assert!(van.path_id.is_none());
    assert_eq!(world.order_status(order), Some(OrderStatus::EnRoute));

    world.tick(100.0);
    let van = &world.state().vehicles[&vehicle];
    assert_eq!(van.status, VehicleStatus::OnMission);
    assert!(van.path_id.is_some());
    assert!(van.position.is_some());
    assert_eq!(world.order_status(order), Some(OrderStatus::Delivering));
}

#[test]
fn test_requester_removed_mid_trip() {
    let (mut world, provider, requester, vehicle) = two_warehouses(VehicleKind::Van);
    world.deposit_items(provider, &items([("A", 4)])).unwrap();
    let order = world
        .create_order(requester, provider, items([("A", 4)]))
        .unwrap();

    run_ticks(&mut world, 3, 100.0);
    assert_eq!(world.order_status(order), Some(OrderStatus::Delivering));
    world.remove_node(requester).unwrap();
    world.drain_events();

    run_ticks(&mut world, 300, 100.0);

    // Returning while the goods travel back, closed once they are home
    let changes: Vec<_> = world
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            SimEvent::OrderStatusChanged { order: o, from, to } if o == order => Some((from, to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        changes,
        vec![
            (OrderStatus::Delivering, OrderStatus::Returning),
            (OrderStatus::Returning, OrderStatus::Completed),
        ]
    );
    assert_eq!(world.order_status(order), Some(OrderStatus::Completed));
    assert_eq!(world.state().economy.deliveries_completed, 0);
    let van = &world.state().vehicles[&vehicle];
    assert_eq!(van.status, VehicleStatus::Docked);
    assert_eq!(van.home_node, Some(provider));
    // Goods came back with the vehicle
    assert_eq!(
        world.state().nodes[&provider]
            .inventory
            .count(&ResourceKind::new("A")),
        4
    );
}

#[test]
fn test_returning_order_closed_when_vehicle_has_no_home() {
    let (mut world, provider, requester, vehicle) = two_warehouses(VehicleKind::Van);
    world.deposit_items(provider, &items([("A", 4)])).unwrap();
    let order = world
        .create_order(requester, provider, items([("A", 4)]))
        .unwrap();

    run_ticks(&mut world, 3, 100.0);
    world.remove_node(requester).unwrap();
    world.remove_node(provider).unwrap();

    run_ticks(&mut world, 300, 100.0);

    assert_eq!(world.order_status(order), Some(OrderStatus::Completed));
    let van = &world.state().vehicles[&vehicle];
    assert_eq!(van.status, VehicleStatus::Free);
    assert!(van.home_node.is_none());
    assert_eq!(van.cargo.values().sum::<u32>(), 4);
}

#[test]
fn test_oversized_order_waits_without_overflow() {
    let (mut world, provider, requester, vehicle) = two_warehouses(VehicleKind::Truck);
    world.deposit_items(provider, &items([("A", 10)])).unwrap();
    let order = world
        .create_order(requester, provider, items([("A", u32::MAX), ("B", 1)]))
        .unwrap();

    run_ticks(&mut world, 20, 100.0);

    assert_eq!(world.state().orders[&order].total_items(), u32::MAX);
    assert_eq!(world.order_status(order), Some(OrderStatus::Pending));
    assert_eq!(world.state().vehicles[&vehicle].status, VehicleStatus::Docked);
}

#[test]
fn test_delivery_leaves_money_unchanged() {
    let (mut world, provider, requester, _) = two_warehouses(VehicleKind::Van);
    world.deposit_items(provider, &items([("A", 5)])).unwrap();
    world
        .create_order(requester, provider, items([("A", 5)]))
        .unwrap();
    let money = world.money();

    run_ticks(&mut world, 200, 100.0);

    assert_eq!(world.state().economy.deliveries_completed, 1);
    assert_eq!(world.money(), money);
}
