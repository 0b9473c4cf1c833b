//! Read-only view of the world for renderers and UI panels

use serde::Serialize;

use super::node::NodeKind;
use super::state::SimState;
use super::types::{ClientId, GeoPoint, ItemSet, NodeId, PathId, VehicleId};
use super::vehicle::{VehicleKind, VehicleStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub position: GeoPoint,
    pub kind: NodeKind,
    pub size: f64,
    pub inventory: ItemSet,
    pub capacity: Option<u32>,
    pub fleet_size: usize,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathView {
    pub id: PathId,
    pub geometry: Vec<GeoPoint>,
    pub active: bool,
    pub temporary: bool,
}

/// Only vehicles that are on the map; docked ones are hidden
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleView {
    pub id: VehicleId,
    pub kind: VehicleKind,
    pub position: GeoPoint,
    pub status: VehicleStatus,
    pub cargo_total: u32,
    pub capacity: u32,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientView {
    pub id: ClientId,
    pub position: GeoPoint,
    /// 0 when just spawned, 1 when out of patience
    pub wait_ratio: f64,
    pub served: bool,
    pub abandoned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub nodes: Vec<NodeView>,
    pub paths: Vec<PathView>,
    pub vehicles: Vec<VehicleView>,
    pub clients: Vec<ClientView>,
    pub money: f64,
    pub production_active: bool,
    pub now_ms: f64,
    pub tick: u64,
}

impl WorldSnapshot {
    pub fn capture(state: &SimState) -> Self {
        let nodes = state
            .nodes
            .values()
            .map(|node| NodeView {
                id: node.id,
                position: node.position,
                kind: node.kind(),
                size: node.size,
                inventory: node.inventory.items().clone(),
                capacity: node.inventory.capacity(),
                fleet_size: node.fleet.len(),
                selected: node.selected,
            })
            .collect();

        let paths = state
            .paths
            .values()
            .map(|path| PathView {
                id: path.id,
                geometry: path.geometry.clone(),
                active: path.active,
                temporary: path.temporary,
            })
            .collect();

        let vehicles = state
            .vehicles
            .values()
            .filter(|vehicle| vehicle.is_visible())
            .filter_map(|vehicle| {
                Some(VehicleView {
                    id: vehicle.id,
                    kind: vehicle.kind,
                    position: vehicle.position?,
                    status: vehicle.status,
                    cargo_total: vehicle.cargo_total(),
                    capacity: vehicle.capacity,
                    selected: vehicle.selected,
                })
            })
            .collect();

        let clients = state
            .clients
            .values()
            .map(|client| ClientView {
                id: client.id,
                position: client.position,
                wait_ratio: client.wait_ratio(),
                served: client.served,
                abandoned: client.abandoned,
            })
            .collect();

        Self {
            nodes,
            paths,
            vehicles,
            clients,
            money: state.economy.money,
            production_active: state.production_active,
            now_ms: state.now_ms,
            tick: state.tick,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeView> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&VehicleView> {
        self.vehicles.iter().find(|vehicle| vehicle.id == id)
    }
}
