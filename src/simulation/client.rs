//! Clients: transient demand generated around stores

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::types::{ClientId, GeoPoint, ItemSet, NodeId};

/// Shortest patience a generated client can have
pub const BASE_PATIENCE_MS: f64 = 5000.0;
/// Random extra patience on top of the base
pub const PATIENCE_JITTER_MS: f64 = 5000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimClient {
    pub id: ClientId,
    pub position: GeoPoint,
    pub demand: ItemSet,
    pub origin_store: NodeId,
    pub patience_ms: f64,
    pub waited_ms: f64,
    /// Stores currently serving this client
    pub attending_stores: BTreeSet<NodeId>,
    pub served: bool,
    pub abandoned: bool,
}

impl SimClient {
    pub fn new(
        id: ClientId,
        position: GeoPoint,
        demand: ItemSet,
        patience_ms: f64,
        origin_store: NodeId,
    ) -> Self {
        Self {
            id,
            position,
            demand,
            origin_store,
            patience_ms,
            waited_ms: 0.0,
            attending_stores: BTreeSet::new(),
            served: false,
            abandoned: false,
        }
    }

    /// Served or gone; either way it leaves the registry at the end of the tick
    pub fn is_settled(&self) -> bool {
        self.served || self.abandoned
    }

    /// Free to be picked up by a store
    pub fn is_unclaimed(&self) -> bool {
        !self.is_settled() && self.attending_stores.is_empty()
    }

    /// Fraction of patience used up, 0..=1
    pub fn wait_ratio(&self) -> f64 {
        if self.patience_ms <= 0.0 {
            return 1.0;
        }
        (self.waited_ms / self.patience_ms).clamp(0.0, 1.0)
    }

    pub fn serve(&mut self, store: NodeId) {
        if self.is_settled() {
            return;
        }
        self.attending_stores.insert(store);
        self.served = true;
    }

    /// Accumulate waiting time. Returns true on the tick the client gives up.
    pub fn tick_wait(&mut self, delta_ms: f64) -> bool {
        if self.is_settled() {
            return false;
        }
        self.waited_ms += delta_ms;
        if self.waited_ms >= self.patience_ms {
            self.abandoned = true;
            return true;
        }
        false
    }
}
