//! Entity registries
//!
//! One keyed collection per entity kind. Everything iterates in ascending id
//! order, which is also the tie-break policy wherever two entities compete.

use std::collections::BTreeMap;

use super::client::SimClient;
use super::economy::Economy;
use super::node::SimNode;
use super::order::Order;
use super::path::Path;
use super::types::{ClientId, NodeId, OrderId, PathId, SimId, VehicleId};
use super::vehicle::SimVehicle;

/// Next id to hand out for each entity kind. Ids start at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdCounters {
    pub next_node: u64,
    pub next_path: u64,
    pub next_vehicle: u64,
    pub next_client: u64,
    pub next_order: u64,
}

impl Default for IdCounters {
    fn default() -> Self {
        Self {
            next_node: 1,
            next_path: 1,
            next_vehicle: 1,
            next_client: 1,
            next_order: 1,
        }
    }
}

fn bump(counter: &mut u64) -> SimId {
    let id = SimId(*counter);
    *counter += 1;
    id
}

impl IdCounters {
    pub fn node(&mut self) -> NodeId {
        NodeId(bump(&mut self.next_node))
    }

    pub fn path(&mut self) -> PathId {
        PathId(bump(&mut self.next_path))
    }

    pub fn vehicle(&mut self) -> VehicleId {
        VehicleId(bump(&mut self.next_vehicle))
    }

    pub fn client(&mut self) -> ClientId {
        ClientId(bump(&mut self.next_client))
    }

    pub fn order(&mut self) -> OrderId {
        OrderId(bump(&mut self.next_order))
    }

    /// Counters that continue above the highest id present in `state`
    pub fn above(state: &SimState) -> Self {
        fn next<K: Copy>(keys: impl Iterator<Item = K>, raw: impl Fn(K) -> u64) -> u64 {
            keys.map(raw).max().map(|max| max + 1).unwrap_or(1)
        }
        Self {
            next_node: next(state.nodes.keys().copied(), NodeId::raw),
            next_path: next(state.paths.keys().copied(), PathId::raw),
            next_vehicle: next(state.vehicles.keys().copied(), VehicleId::raw),
            next_client: next(state.clients.keys().copied(), ClientId::raw),
            next_order: next(state.orders.keys().copied(), OrderId::raw),
        }
    }
}

/// All simulation entities plus global flags
#[derive(Debug, Clone, Default)]
pub struct SimState {
    pub nodes: BTreeMap<NodeId, SimNode>,
    pub paths: BTreeMap<PathId, Path>,
    pub vehicles: BTreeMap<VehicleId, SimVehicle>,
    pub clients: BTreeMap<ClientId, SimClient>,
    pub orders: BTreeMap<OrderId, Order>,
    pub economy: Economy,
    pub production_active: bool,
    /// Time passed to the latest tick, ms
    pub now_ms: f64,
    /// Ticks run so far
    pub tick: u64,
    pub ids: IdCounters,
}

impl SimState {
    pub fn new(money: f64, production_active: bool) -> Self {
        Self {
            economy: Economy::new(money),
            production_active,
            ..Self::default()
        }
    }
}
