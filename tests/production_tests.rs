//! Production and transformation over simulated time

use logistics_sim::simulation::{
    items, GeoPoint, NodeEdit, NodeKind, ResourceKind, SimEvent, SimWorld, TRANSFORMER_CAPACITY,
};

fn origin() -> GeoPoint {
    GeoPoint::new(-33.45, -70.66)
}

fn run_ticks(world: &mut SimWorld, ticks: u32, delta_ms: f64) {
    for _ in 0..ticks {
        world.tick(delta_ms);
    }
}

#[test]
fn test_source_produces_one_unit_per_interval() {
    let mut world = SimWorld::new_with_seed(1);
    let source = world.add_node(origin(), NodeKind::Source);
    world
        .edit_node(source, NodeEdit::ProductionInterval(1000.0))
        .unwrap();
    world
        .edit_node(source, NodeEdit::InventoryCapacity(Some(10)))
        .unwrap();

    // 50 ticks of 100ms = 5000ms
    run_ticks(&mut world, 50, 100.0);

    let node = &world.state().nodes[&source];
    assert_eq!(node.inventory.count(&ResourceKind::new("A")), 5);
    assert_eq!(node.inventory.total(), 5);
}

#[test]
fn test_source_respects_capacity() {
    let mut world = SimWorld::new_with_seed(1);
    let source = world.add_node(origin(), NodeKind::Source);
    world
        .edit_node(source, NodeEdit::InventoryCapacity(Some(3)))
        .unwrap();

    // Default interval is 100ms, so 20 units would be produced without a cap
    run_ticks(&mut world, 20, 100.0);

    assert_eq!(world.state().nodes[&source].inventory.total(), 3);
    assert_eq!(world.state().economy.units_discarded, 17);
}

#[test]
fn test_production_paused() {
    let mut world = SimWorld::new_with_seed(1);
    let source = world.add_node(origin(), NodeKind::Source);

    assert!(!world.toggle_production());
    run_ticks(&mut world, 20, 100.0);
    assert_eq!(world.state().nodes[&source].inventory.total(), 0);

    let events = world.drain_events();
    assert!(events.contains(&SimEvent::ProductionToggled(false)));

    assert!(world.toggle_production());
    run_ticks(&mut world, 1, 100.0);
    assert_eq!(world.state().nodes[&source].inventory.total(), 1);
}

#[test]
fn test_source_item_edit() {
    let mut world = SimWorld::new_with_seed(1);
    let source = world.add_node(origin(), NodeKind::Source);
    world
        .edit_node(source, NodeEdit::SourceItem(ResourceKind::new("C")))
        .unwrap();

    run_ticks(&mut world, 3, 100.0);

    let node = &world.state().nodes[&source];
    assert_eq!(node.inventory.count(&ResourceKind::new("C")), 3);
    assert_eq!(node.inventory.count(&ResourceKind::new("A")), 0);
}

#[test]
fn test_transformer_converts_one_unit_at_a_time() {
    let mut world = SimWorld::new_with_seed(1);
    let transformer = world.add_node(origin(), NodeKind::Transformer);
    world
        .deposit_items(transformer, &items([("A", 2)]))
        .unwrap();

    // Tick 1 (t=100) starts the first unit; it finishes at t=600
    run_ticks(&mut world, 5, 100.0);
    let node = &world.state().nodes[&transformer];
    assert_eq!(node.inventory.count(&ResourceKind::new("A")), 2);
    assert_eq!(node.inventory.count(&ResourceKind::new("B")), 0);

    run_ticks(&mut world, 1, 100.0);
    let node = &world.state().nodes[&transformer];
    assert_eq!(node.inventory.count(&ResourceKind::new("A")), 1);
    assert_eq!(node.inventory.count(&ResourceKind::new("B")), 1);

    // Second unit starts at t=700 and finishes at t=1200
    run_ticks(&mut world, 6, 100.0);
    let node = &world.state().nodes[&transformer];
    assert_eq!(node.inventory.count(&ResourceKind::new("A")), 0);
    assert_eq!(node.inventory.count(&ResourceKind::new("B")), 2);

    // Nothing left to work on
    run_ticks(&mut world, 10, 100.0);
    assert_eq!(world.state().nodes[&transformer].inventory.total(), 2);
}

#[test]
fn test_transformer_without_input_produces_nothing() {
    let mut world = SimWorld::new_with_seed(1);
    let transformer = world.add_node(origin(), NodeKind::Transformer);
    world
        .deposit_items(transformer, &items([("A", 1)]))
        .unwrap();

    // Start the cycle, then take the input away before it completes
    run_ticks(&mut world, 1, 100.0);
    world
        .edit_node(transformer, NodeEdit::InventoryCapacity(Some(0)))
        .unwrap();
    world
        .edit_node(
            transformer,
            NodeEdit::InventoryCapacity(Some(TRANSFORMER_CAPACITY)),
        )
        .unwrap();
    run_ticks(&mut world, 10, 100.0);

    assert_eq!(world.state().nodes[&transformer].inventory.total(), 0);
}

#[test]
fn test_transformer_custom_recipe() {
    let mut world = SimWorld::new_with_seed(1);
    let transformer = world.add_node(origin(), NodeKind::Transformer);
    world
        .edit_node(transformer, NodeEdit::TransformInput(ResourceKind::new("B")))
        .unwrap();
    world
        .edit_node(transformer, NodeEdit::TransformOutput(ResourceKind::new("C")))
        .unwrap();
    world
        .edit_node(transformer, NodeEdit::TransformDuration(200.0))
        .unwrap();
    world
        .deposit_items(transformer, &items([("A", 1), ("B", 1)]))
        .unwrap();

    run_ticks(&mut world, 5, 100.0);

    let node = &world.state().nodes[&transformer];
    assert_eq!(node.inventory.count(&ResourceKind::new("A")), 1);
    assert_eq!(node.inventory.count(&ResourceKind::new("B")), 0);
    assert_eq!(node.inventory.count(&ResourceKind::new("C")), 1);
}

#[test]
fn test_new_node_timers_start_at_current_time() {
    let mut world = SimWorld::new_with_seed(1);
    run_ticks(&mut world, 30, 100.0);

    let source = world.add_node(origin(), NodeKind::Source);
    world
        .edit_node(source, NodeEdit::ProductionInterval(1000.0))
        .unwrap();

    // Added at t=3000, so nothing until t=4000
    run_ticks(&mut world, 9, 100.0);
    assert_eq!(world.state().nodes[&source].inventory.total(), 0);
    run_ticks(&mut world, 1, 100.0);
    assert_eq!(world.state().nodes[&source].inventory.total(), 1);
}

#[test]
fn test_produced_events_emitted() {
    let mut world = SimWorld::new_with_seed(1);
    let source = world.add_node(origin(), NodeKind::Source);
    world.drain_events();

    world.tick(100.0);

    let events = world.drain_events();
    assert!(events.contains(&SimEvent::ItemProduced {
        node: source,
        kind: ResourceKind::new("A"),
        stored: true,
    }));
    assert_eq!(events.last(), Some(&SimEvent::StateChanged));
}
