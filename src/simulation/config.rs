//! Tunable simulation parameters
//!
//! Every field has a default, so a config file only needs the values it
//! changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::catalog::ResourceCatalog;
use super::client::{BASE_PATIENCE_MS, PATIENCE_JITTER_MS};
use super::economy::{RESET_MONEY, STARTING_MONEY};
use super::vehicle::DEFAULT_SPEED_FACTOR;

/// Most clients a store spawns per batch
pub const MAX_CLIENTS_PER_BATCH: u32 = 10;
/// Clients never spawn closer to their store than this
pub const MIN_CLIENT_RADIUS_M: f64 = 10.0;
/// How far an endpoint may be from a node and still snap onto the path network
pub const ROUTE_SNAP_DISTANCE_M: f64 = 30.0;
/// Default radius for "which node is under this point" lookups
pub const NODE_LOOKUP_THRESHOLD_M: f64 = 30.0;
/// Radius around the home node at which an expelled vehicle is dropped
pub const EXPEL_RADIUS_M: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub starting_money: f64,
    pub reset_money: f64,
    pub production_active: bool,
    pub speed_factor: f64,
    /// Ticks between issuing a route request and applying its result (min 1)
    pub route_latency_ticks: u64,
    pub max_clients_per_batch: u32,
    pub min_client_radius_m: f64,
    pub patience_base_ms: f64,
    pub patience_jitter_ms: f64,
    pub route_snap_distance_m: f64,
    pub node_lookup_threshold_m: f64,
    pub expel_radius_m: f64,
    pub catalog: ResourceCatalog,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            starting_money: STARTING_MONEY,
            reset_money: RESET_MONEY,
            production_active: true,
            speed_factor: DEFAULT_SPEED_FACTOR,
            route_latency_ticks: 1,
            max_clients_per_batch: MAX_CLIENTS_PER_BATCH,
            min_client_radius_m: MIN_CLIENT_RADIUS_M,
            patience_base_ms: BASE_PATIENCE_MS,
            patience_jitter_ms: PATIENCE_JITTER_MS,
            route_snap_distance_m: ROUTE_SNAP_DISTANCE_M,
            node_lookup_threshold_m: NODE_LOOKUP_THRESHOLD_M,
            expel_radius_m: EXPEL_RADIUS_M,
            catalog: ResourceCatalog::default(),
        }
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json).context("Invalid config JSON")?;
        Ok(config.normalized())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Clamp values that would break the tick pipeline
    pub fn normalized(mut self) -> Self {
        self.route_latency_ticks = self.route_latency_ticks.max(1);
        self.max_clients_per_batch = self.max_clients_per_batch.max(1);
        self.min_client_radius_m = self.min_client_radius_m.max(0.0);
        self.patience_jitter_ms = self.patience_jitter_ms.max(0.0);
        self
    }
}
