//! Per-tick node behaviour
//!
//! Production, transformation, store customers and order dispatch. Each phase
//! takes the whole state, mutates it and returns the events it produced, so
//! the pipeline can be driven and inspected without a renderer.

use log::{debug, info};
use std::f64::consts::TAU;

use super::client::SimClient;
use super::config::SimConfig;
use super::events::{abandon_effect, money_effect, SimEvent};
use super::node::{NodeBehavior, NodeUpdateResult, SimNode};
use super::order::OrderStatus;
use super::rng::SimRng;
use super::routing::{RoutePurpose, RouteQueue};
use super::state::SimState;
use super::types::{ClientId, ItemSet, NodeId, OrderId, VehicleId};

/// Most distinct kinds a generated client asks for
pub const MAX_DEMAND_KINDS: usize = 3;

/// Sources drop one unit into inventory every production interval.
/// Does nothing while production is switched off.
pub fn update_production(state: &mut SimState) -> Vec<SimEvent> {
    let mut events = Vec::new();
    if !state.production_active {
        return events;
    }

    let now = state.now_ms;
    for node in state.nodes.values_mut() {
        if let NodeUpdateResult::Produced { kind, stored } = node.produce(now) {
            if !stored {
                state.economy.record_discard(1);
            }
            events.push(SimEvent::ItemProduced {
                node: node.id,
                kind,
                stored,
            });
        }
    }
    events
}

/// Advance every transformer's one-unit cycle
pub fn update_transformers(state: &mut SimState) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let now = state.now_ms;
    for node in state.nodes.values_mut() {
        match node.transform(now) {
            NodeUpdateResult::Transformed { output, stored } => {
                if !stored {
                    state.economy.record_discard(1);
                }
                events.push(SimEvent::ItemTransformed {
                    node: node.id,
                    output,
                    stored,
                });
            }
            NodeUpdateResult::TransformStarted { input } => {
                debug!("Transformer {} started a unit of {}", node.id, input);
            }
            _ => {}
        }
    }
    events
}

/// Stores spawn client batches on their timer, then serve whoever they can.
/// Stores are visited in ascending id order, so with overlapping areas the
/// lowest id store gets first pick.
pub fn update_stores(state: &mut SimState, config: &SimConfig, rng: &mut SimRng) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let now = state.now_ms;

    let store_ids: Vec<NodeId> = state
        .nodes
        .values()
        .filter(|node| node.store_state().is_some())
        .map(|node| node.id)
        .collect();

    for store_id in store_ids {
        let due = state
            .nodes
            .get_mut(&store_id)
            .and_then(SimNode::store_state_mut)
            .map(|store| {
                let due = now - store.last_generation_ms >= store.generation_interval_ms;
                if due {
                    store.last_generation_ms = now;
                }
                due
            })
            .unwrap_or(false);

        if due {
            events.extend(generate_clients(state, store_id, config, rng));
        }

        events.extend(serve_clients(state, store_id, config));
    }

    events
}

/// Spawn a random batch of clients inside a store's area of influence
fn generate_clients(
    state: &mut SimState,
    store_id: NodeId,
    config: &SimConfig,
    rng: &mut SimRng,
) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let Some(node) = state.nodes.get(&store_id) else {
        return events;
    };
    let Some(store) = node.store_state() else {
        return events;
    };
    let kinds = config.catalog.kinds();
    if kinds.is_empty() {
        return events;
    }

    let center = node.position;
    let radius = store.influence_radius_m;
    let batch = rng.random_range(1..=config.max_clients_per_batch);

    for _ in 0..batch {
        let angle = rng.random_range(0.0..TAU);
        let distance = if radius > config.min_client_radius_m {
            rng.random_range(config.min_client_radius_m..=radius)
        } else {
            radius.max(0.0)
        };
        let position = center.offset_m(distance, angle);

        let demand_kinds = rng.random_range(1..=MAX_DEMAND_KINDS.min(kinds.len()));
        let demand: ItemSet = rng
            .choose_multiple(&kinds, demand_kinds)
            .into_iter()
            .map(|kind| (kind, 1))
            .collect();

        let patience = if config.patience_jitter_ms > 0.0 {
            config.patience_base_ms + rng.random_range(0.0..config.patience_jitter_ms)
        } else {
            config.patience_base_ms
        };

        let id = state.ids.client();
        state
            .clients
            .insert(id, SimClient::new(id, position, demand, patience, store_id));
        events.push(SimEvent::ClientSpawned {
            client: id,
            store: store_id,
        });
    }

    debug!("Store {} spawned {} clients", store_id, batch);
    events
}

/// Serve unclaimed clients in range whose whole demand is on the shelves.
/// A match consumes stock and credits money on the spot; there is no partial
/// service and no bidding between stores.
fn serve_clients(state: &mut SimState, store_id: NodeId, config: &SimConfig) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let now = state.now_ms;
    let SimState {
        nodes,
        clients,
        economy,
        ..
    } = state;

    let Some(SimNode {
        position,
        inventory,
        behavior: NodeBehavior::Store(store),
        ..
    }) = nodes.get_mut(&store_id)
    else {
        return events;
    };

    for client in clients.values_mut() {
        if store.remaining_attention() == 0 {
            break;
        }
        if !client.is_unclaimed() {
            continue;
        }
        if position.distance_m(&client.position) > store.influence_radius_m {
            continue;
        }
        if !inventory.has_enough(&client.demand) {
            continue;
        }

        inventory.consume(&client.demand);
        let revenue = config.catalog.value_of(&client.demand);
        economy.record_sale(revenue);
        client.serve(store_id);
        store.attending.insert(client.id);

        debug!(
            "Store {} served client {} for ${:.0}",
            store_id, client.id, revenue
        );
        events.push(SimEvent::ClientServed {
            client: client.id,
            store: store_id,
            revenue,
        });
        events.push(SimEvent::MoneyChanged(economy.money));
        events.push(money_effect(revenue, client.position, now));
    }

    events
}

/// Try to dispatch every pending order. A provider that no longer exists
/// rejects the order; missing stock or vehicles leave it pending for the next
/// tick. Dispatched orders leave Pending, so a second pass in the same tick
/// launches nothing new.
pub fn process_pending_orders(state: &mut SimState, routes: &mut RouteQueue) -> Vec<SimEvent> {
    let mut events = Vec::new();

    let pending: Vec<OrderId> = state
        .orders
        .values()
        .filter(|order| order.status == OrderStatus::Pending)
        .map(|order| order.id)
        .collect();

    for order_id in pending {
        let Some(order) = state.orders.get(&order_id) else {
            continue;
        };
        let (provider_id, requester_id, items) =
            (order.provider, order.requester, order.items.clone());

        let endpoints = state
            .nodes
            .get(&provider_id)
            .zip(state.nodes.get(&requester_id))
            .map(|(provider, requester)| (provider.position, requester.position));
        let Some((from, to)) = endpoints else {
            events.extend(reject_order(state, order_id));
            continue;
        };

        let Some(vehicle_id) = find_carrier(state, provider_id, &items) else {
            continue;
        };

        // Load first: a refused load leaves everything untouched
        let Some(vehicle) = state.vehicles.get_mut(&vehicle_id) else {
            continue;
        };
        if vehicle.load(&items).is_err() {
            continue;
        }
        let ticket = routes.submit(
            from,
            to,
            RoutePurpose::Deliver {
                order: order_id,
                vehicle: vehicle_id,
                provider: provider_id,
                requester: requester_id,
            },
            state.tick,
        );
        vehicle.pending_route = Some(ticket);

        if let Some(provider) = state.nodes.get_mut(&provider_id) {
            provider.inventory.consume(&items);
            provider.remove_from_fleet(vehicle_id);
        }

        if let Some(order) = state.orders.get_mut(&order_id) {
            if order.assign(vehicle_id).is_ok() {
                info!(
                    "Order {} approved: provider {} loads vehicle {} for {}",
                    order_id, provider_id, vehicle_id, requester_id
                );
                events.push(SimEvent::OrderStatusChanged {
                    order: order_id,
                    from: OrderStatus::Pending,
                    to: OrderStatus::EnRoute,
                });
            }
        }
    }

    events
}

/// First idle vehicle in the provider's fleet that can take the whole load,
/// provided the provider also has the stock
fn find_carrier(state: &SimState, provider_id: NodeId, items: &ItemSet) -> Option<VehicleId> {
    let provider = state.nodes.get(&provider_id)?;
    if !provider.inventory.has_enough(items) {
        return None;
    }
    provider.fleet.iter().copied().find(|id| {
        state
            .vehicles
            .get(id)
            .is_some_and(|vehicle| vehicle.is_idle() && vehicle.can_carry(items))
    })
}

fn reject_order(state: &mut SimState, order_id: OrderId) -> Vec<SimEvent> {
    let Some(order) = state.orders.get_mut(&order_id) else {
        return Vec::new();
    };
    match order.advance(OrderStatus::Rejected) {
        Ok(from) => {
            info!("Order {} rejected: an endpoint no longer exists", order_id);
            state.economy.record_rejection();
            vec![SimEvent::OrderStatusChanged {
                order: order_id,
                from,
                to: OrderStatus::Rejected,
            }]
        }
        Err(_) => Vec::new(),
    }
}

/// Waiting clients lose patience; served and abandoned clients are pruned and
/// released from the stores that were attending them.
pub fn update_clients(state: &mut SimState, delta_ms: f64) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let now = state.now_ms;

    for client in state.clients.values_mut() {
        if client.tick_wait(delta_ms) {
            state.economy.record_abandonment();
            events.push(SimEvent::ClientAbandoned(client.id));
            events.push(abandon_effect(client.position, now));
        }
    }

    let settled: Vec<ClientId> = state
        .clients
        .values()
        .filter(|client| client.is_settled())
        .map(|client| client.id)
        .collect();

    for client_id in settled {
        if let Some(client) = state.clients.remove(&client_id) {
            for store_id in client.attending_stores {
                if let Some(store) = state
                    .nodes
                    .get_mut(&store_id)
                    .and_then(SimNode::store_state_mut)
                {
                    store.attending.remove(&client_id);
                }
            }
        }
    }

    events
}
