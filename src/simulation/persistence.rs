//! Saving and loading the world as JSON

use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;

use super::client::SimClient;
use super::economy::Economy;
use super::node::SimNode;
use super::order::Order;
use super::path::Path;
use super::routing::{RouteQueue, RouteRequest};
use super::state::{IdCounters, SimState};
use super::vehicle::SimVehicle;

/// Format version written by this build
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("save format version {found} is newer than the supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("malformed save data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not access save file: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything needed to bring a world back exactly where it was
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub economy: Economy,
    pub production_active: bool,
    pub now_ms: f64,
    pub tick: u64,
    pub nodes: Vec<SimNode>,
    pub paths: Vec<Path>,
    pub vehicles: Vec<SimVehicle>,
    #[serde(default)]
    pub clients: Vec<SimClient>,
    #[serde(default)]
    pub orders: Vec<Order>,
    /// Routes requested but not yet applied
    #[serde(default)]
    pub route_requests: Vec<RouteRequest>,
}

impl SaveData {
    pub fn capture(state: &SimState, routes: &RouteQueue) -> Self {
        Self {
            version: SAVE_VERSION,
            economy: state.economy.clone(),
            production_active: state.production_active,
            now_ms: state.now_ms,
            tick: state.tick,
            nodes: state.nodes.values().cloned().collect(),
            paths: state.paths.values().cloned().collect(),
            vehicles: state.vehicles.values().cloned().collect(),
            clients: state.clients.values().cloned().collect(),
            orders: state.orders.values().cloned().collect(),
            route_requests: routes.requests().cloned().collect(),
        }
    }

    /// Rebuild the registries. Id counters continue above the highest id
    /// loaded, so new entities never collide with restored ones.
    pub fn into_state(self) -> (SimState, Vec<RouteRequest>) {
        let mut state = SimState {
            nodes: self.nodes.into_iter().map(|node| (node.id, node)).collect(),
            paths: self.paths.into_iter().map(|path| (path.id, path)).collect(),
            vehicles: self.vehicles.into_iter().map(|v| (v.id, v)).collect(),
            clients: self.clients.into_iter().map(|c| (c.id, c)).collect(),
            orders: self.orders.into_iter().map(|o| (o.id, o)).collect(),
            economy: self.economy,
            production_active: self.production_active,
            now_ms: self.now_ms,
            tick: self.tick,
            ids: IdCounters::default(),
        };
        state.ids = IdCounters::above(&state);
        (state, self.route_requests)
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let data: SaveData = serde_json::from_str(json)?;
        if data.version > SAVE_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: data.version,
                supported: SAVE_VERSION,
            });
        }
        Ok(data)
    }

    pub fn save_to_file(&self, path: &FsPath) -> Result<(), PersistenceError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from_file(path: &FsPath) -> Result<Self, PersistenceError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
