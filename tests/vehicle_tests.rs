//! Vehicle motion along paths and free-vehicle commands

use logistics_sim::simulation::{
    items, GeoPoint, Mission, MissionKind, MissionTarget, NodeKind, Path, PathEnd, PathId, RouteData,
    SimError, SimId, SimVehicle, SimWorld, StraightLineRouter, VehicleId, VehicleKind,
    VehicleStatus, VehicleUpdateResult, DEFAULT_SPEED_FACTOR, EXPEL_RADIUS_M,
};

fn origin() -> GeoPoint {
    GeoPoint::new(-33.45, -70.66)
}

fn run_ticks(world: &mut SimWorld, ticks: u32, delta_ms: f64) {
    for _ in 0..ticks {
        world.tick(delta_ms);
    }
}

/// Three-point polyline: 300m north, then 400m east
fn bent_path() -> Path {
    let a = origin();
    let b = a.offset_m(300.0, 0.0);
    let c = b.offset_m(400.0, std::f64::consts::FRAC_PI_2);
    let route = RouteData::from_geometry(vec![a, b, c]);
    Path::new(
        PathId(SimId(1)),
        PathEnd::Point(a),
        PathEnd::Point(c),
        route,
        true,
    )
}

fn launched_moto(path: &Path) -> SimVehicle {
    let mut vehicle = SimVehicle::new(VehicleId(SimId(1)), VehicleKind::Moto, DEFAULT_SPEED_FACTOR);
    let start = path.first_point().unwrap();
    let end = path.last_point().unwrap();
    vehicle.launch(
        path.id,
        start,
        Mission {
            order: None,
            kind: MissionKind::Move,
            target: MissionTarget::Point(end),
        },
    );
    vehicle
}

#[test]
fn test_vehicle_kinds() {
    assert_eq!(VehicleKind::Moto.capacity(), 5);
    assert_eq!(VehicleKind::Van.capacity(), 30);
    assert_eq!(VehicleKind::Truck.capacity(), 150);

    let truck = SimVehicle::new(VehicleId(SimId(1)), VehicleKind::Truck, DEFAULT_SPEED_FACTOR);
    assert_eq!(truck.speed_kmh(), 30.0 * 20.0);
    assert_eq!(truck.status, VehicleStatus::Docked);
    assert!(truck.position.is_none());
}

#[test]
fn test_interpolates_within_segment() {
    let path = bent_path();
    let mut vehicle = launched_moto(&path);
    let first = path.segments[0];
    let half = first.travel_time_ms(vehicle.speed_kmh()) / 2.0;

    assert_eq!(vehicle.advance(half, &path), VehicleUpdateResult::Moving);

    let expected = first.start.lerp(&first.end, 0.5);
    let position = vehicle.position.unwrap();
    assert!(position.distance_m(&expected) < 0.01);
    assert_eq!(vehicle.segment_index, 0);
}

#[test]
fn test_carries_leftover_time_into_next_segment() {
    let path = bent_path();
    let mut vehicle = launched_moto(&path);
    let speed = vehicle.speed_kmh();
    let first = path.segments[0].travel_time_ms(speed);
    let second = path.segments[1].travel_time_ms(speed);

    vehicle.advance(first + second / 4.0, &path);

    assert_eq!(vehicle.segment_index, 1);
    let segment = path.segments[1];
    let expected = segment.start.lerp(&segment.end, 0.25);
    assert!(vehicle.position.unwrap().distance_m(&expected) < 0.01);
}

#[test]
fn test_arrives_exactly_at_endpoint() {
    let path = bent_path();
    let mut vehicle = launched_moto(&path);
    let total = path.total_travel_time_ms(vehicle.speed_kmh());
    let end = path.last_point().unwrap();

    assert_eq!(
        vehicle.advance(total, &path),
        VehicleUpdateResult::Arrived(end)
    );
    assert_eq!(vehicle.position, Some(end));
}

#[test]
fn test_never_reported_past_endpoint() {
    let path = bent_path();
    let mut vehicle = launched_moto(&path);
    let total = path.total_travel_time_ms(vehicle.speed_kmh());
    let end = path.last_point().unwrap();
    let length = path.total_distance_m();

    let step = total / 37.0;
    let mut travelled_ok = true;
    for _ in 0..36 {
        if let VehicleUpdateResult::Arrived(_) = vehicle.advance(step, &path) {
            break;
        }
        let position = vehicle.position.unwrap();
        travelled_ok &= position.distance_m(&origin()) <= length + 0.01;
    }
    assert!(travelled_ok);

    // Overshooting by a lot still lands on the endpoint
    assert_eq!(
        vehicle.advance(total * 10.0, &path),
        VehicleUpdateResult::Arrived(end)
    );
    assert_eq!(vehicle.position, Some(end));
}

#[test]
fn test_advance_ignored_when_not_on_mission() {
    let path = bent_path();
    let mut vehicle = SimVehicle::new(VehicleId(SimId(1)), VehicleKind::Van, DEFAULT_SPEED_FACTOR);
    assert_eq!(vehicle.advance(1000.0, &path), VehicleUpdateResult::Idle);
    assert!(vehicle.position.is_none());
}

#[test]
fn test_load_refuses_over_capacity() {
    let mut vehicle = SimVehicle::new(VehicleId(SimId(1)), VehicleKind::Moto, DEFAULT_SPEED_FACTOR);
    let four = items([("A", 4)]);
    let two = items([("B", 2)]);

    assert!(vehicle.load(&four).is_ok());
    assert!(matches!(
        vehicle.load(&two),
        Err(SimError::CapacityExceeded { requested: 2, carried: 4, capacity: 5, .. })
    ));
    assert_eq!(vehicle.cargo_total(), 4);
}

#[test]
fn test_expel_puts_vehicle_on_the_map() {
    let mut world = SimWorld::new_with_seed(9).with_router(Box::new(StraightLineRouter));
    let source = world.add_node(origin(), NodeKind::Source);
    let moto = world.state().nodes[&source].fleet[0];

    let at = world.expel_vehicle(moto).unwrap();

    let vehicle = &world.state().vehicles[&moto];
    assert_eq!(vehicle.status, VehicleStatus::Free);
    assert_eq!(vehicle.position, Some(at));
    assert!(vehicle.home_node.is_none());
    assert!(world.state().nodes[&source].fleet.is_empty());
    assert!((at.distance_m(&origin()) - EXPEL_RADIUS_M).abs() < 0.5);

    // Only docked vehicles can be expelled
    assert!(matches!(
        world.expel_vehicle(moto),
        Err(SimError::InvalidVehicleStatus { expected: VehicleStatus::Docked, .. })
    ));
    assert!(world.snapshot().vehicle(moto).is_some());
}

#[test]
fn test_move_free_vehicle() {
    let mut world = SimWorld::new_with_seed(9).with_router(Box::new(StraightLineRouter));
    let source = world.add_node(origin(), NodeKind::Source);
    let moto = world.state().nodes[&source].fleet[0];
    let target = origin().offset_m(500.0, 2.0);

    assert!(matches!(
        world.move_free_vehicle(moto, target),
        Err(SimError::InvalidVehicleStatus { actual: VehicleStatus::Docked, .. })
    ));
    world.expel_vehicle(moto).unwrap();

    // One trip at a time
    world.move_free_vehicle(moto, target).unwrap();
    assert!(matches!(
        world.move_free_vehicle(moto, target),
        Err(SimError::VehicleBusy(id)) if id == moto
    ));

    run_ticks(&mut world, 50, 100.0);

    let vehicle = &world.state().vehicles[&moto];
    assert_eq!(vehicle.status, VehicleStatus::Free);
    assert_eq!(vehicle.position, Some(target));
    assert!(vehicle.pending_route.is_none());
    assert!(vehicle.path_id.is_none());
    assert!(world.state().paths.is_empty());
}

#[test]
fn test_assign_vehicle_docks_at_new_node() {
    let mut world = SimWorld::new_with_seed(9).with_router(Box::new(StraightLineRouter));
    let source = world.add_node(origin(), NodeKind::Source);
    let warehouse = world.add_node(origin().offset_m(600.0, 1.0), NodeKind::Warehouse);
    let moto = world.state().nodes[&source].fleet[0];

    assert!(matches!(
        world.assign_vehicle_to_node(moto, warehouse),
        Err(SimError::InvalidVehicleStatus { expected: VehicleStatus::Free, .. })
    ));

    world.expel_vehicle(moto).unwrap();
    world.assign_vehicle_to_node(moto, warehouse).unwrap();
    run_ticks(&mut world, 50, 100.0);

    let vehicle = &world.state().vehicles[&moto];
    assert_eq!(vehicle.status, VehicleStatus::Docked);
    assert_eq!(vehicle.home_node, Some(warehouse));
    assert!(vehicle.position.is_none());
    assert_eq!(world.state().nodes[&warehouse].fleet, vec![moto]);
    assert!(world.snapshot().vehicle(moto).is_none());
}

#[test]
fn test_assign_to_removed_node_releases_vehicle() {
    let mut world = SimWorld::new_with_seed(9).with_router(Box::new(StraightLineRouter));
    let source = world.add_node(origin(), NodeKind::Source);
    let warehouse = world.add_node(origin().offset_m(600.0, 1.0), NodeKind::Warehouse);
    let moto = world.state().nodes[&source].fleet[0];

    world.expel_vehicle(moto).unwrap();
    world.assign_vehicle_to_node(moto, warehouse).unwrap();
    world.tick(100.0);
    world.tick(100.0);
    assert_eq!(world.state().vehicles[&moto].status, VehicleStatus::OnMission);

    world.remove_node(warehouse).unwrap();
    run_ticks(&mut world, 50, 100.0);

    let vehicle = &world.state().vehicles[&moto];
    assert_eq!(vehicle.status, VehicleStatus::Free);
    assert!(vehicle.home_node.is_none());
    assert!(vehicle.position.is_some());
}

#[test]
fn test_vehicle_released_when_path_vanishes() {
    let mut world = SimWorld::new_with_seed(9).with_router(Box::new(StraightLineRouter));
    let source = world.add_node(origin(), NodeKind::Source);
    let moto = world.state().nodes[&source].fleet[0];
    world.expel_vehicle(moto).unwrap();
    world
        .move_free_vehicle(moto, origin().offset_m(2000.0, 0.0))
        .unwrap();
    world.tick(100.0);
    world.tick(100.0);

    let path_id = world.state().vehicles[&moto].path_id.unwrap();
    world.remove_path(path_id).unwrap();
    world.tick(100.0);

    let vehicle = &world.state().vehicles[&moto];
    assert_eq!(vehicle.status, VehicleStatus::Free);
    assert!(vehicle.path_id.is_none());
    assert!(vehicle.position.is_some());
}
