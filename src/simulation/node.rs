//! Node types for the logistics simulation
//!
//! Sources, warehouses, transformers, sinks and stores. Each kind carries only
//! the state it needs, and the per-tick production/transformation rules live
//! here next to that state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::error::SimError;
use super::types::{ClientId, GeoPoint, Inventory, NodeId, PathId, ResourceKind, VehicleId};

/// Inventory capacity of a warehouse
pub const WAREHOUSE_CAPACITY: u32 = 1000;
/// Inventory capacity of a transformer
pub const TRANSFORMER_CAPACITY: u32 = 500;
/// Inventory capacity of a store
pub const STORE_CAPACITY: u32 = 150;

/// Default display size
pub const DEFAULT_NODE_SIZE: f64 = 10.0;
/// Milliseconds between units produced by a source
pub const DEFAULT_PRODUCTION_INTERVAL_MS: f64 = 100.0;
/// Milliseconds a transformer spends on one unit
pub const DEFAULT_TRANSFORM_DURATION_MS: f64 = 500.0;
/// How far from a store its clients appear and can be served
pub const DEFAULT_INFLUENCE_RADIUS_M: f64 = 500.0;
/// Milliseconds between client batches at a store
pub const DEFAULT_GENERATION_INTERVAL_MS: f64 = 1800.0;
/// Clients a store can attend at once
pub const DEFAULT_ATTENTION_CAPACITY: usize = 4;
/// Informational sale price of a source's product
pub const DEFAULT_SOURCE_SALE_PRICE: f64 = 3.5;

/// Category of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Source,
    Warehouse,
    Transformer,
    Sink,
    Store,
    Generic,
}

impl NodeKind {
    /// Inventory capacity for this kind, `None` when unbounded
    pub fn default_capacity(self) -> Option<u32> {
        match self {
            NodeKind::Warehouse => Some(WAREHOUSE_CAPACITY),
            NodeKind::Transformer => Some(TRANSFORMER_CAPACITY),
            NodeKind::Store => Some(STORE_CAPACITY),
            NodeKind::Source | NodeKind::Sink | NodeKind::Generic => None,
        }
    }

    /// Kinds this kind may open a user path towards
    pub fn connects_to(self) -> &'static [NodeKind] {
        use NodeKind::*;
        match self {
            Source => &[Warehouse, Transformer, Store, Sink],
            Warehouse => &[Source, Warehouse, Transformer, Sink],
            Transformer => &[Warehouse, Transformer, Sink],
            Sink => &[],
            Store => &[Source, Warehouse, Transformer, Sink],
            Generic => &[Source, Warehouse, Transformer, Sink],
        }
    }

    /// A user path between two kinds is allowed if either side accepts the other
    pub fn can_connect(self, other: NodeKind) -> bool {
        self.connects_to().contains(&other) || other.connects_to().contains(&self)
    }

    pub fn symbol(self) -> char {
        match self {
            NodeKind::Source => 'S',
            NodeKind::Warehouse => 'W',
            NodeKind::Transformer => 'T',
            NodeKind::Sink => 'K',
            NodeKind::Store => '$',
            NodeKind::Generic => '+',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceState {
    pub item: ResourceKind,
    pub production_interval_ms: f64,
    pub last_production_ms: f64,
    pub sale_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerState {
    pub input: ResourceKind,
    pub output: ResourceKind,
    pub duration_ms: f64,
    pub processing: bool,
    /// Start of the unit currently in flight
    pub last_transform_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub influence_radius_m: f64,
    pub generation_interval_ms: f64,
    pub last_generation_ms: f64,
    pub attention_capacity: usize,
    /// Clients this store is serving right now
    pub attending: BTreeSet<ClientId>,
}

impl StoreState {
    pub fn remaining_attention(&self) -> usize {
        self.attention_capacity.saturating_sub(self.attending.len())
    }
}

/// Kind-specific behaviour. Exactly one block is active per node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeBehavior {
    Source(SourceState),
    Warehouse,
    Transformer(TransformerState),
    Sink,
    Store(StoreState),
    Generic,
}

impl NodeBehavior {
    /// Fresh behaviour for a kind, timers starting at `now_ms`
    pub fn for_kind(kind: NodeKind, now_ms: f64) -> Self {
        match kind {
            NodeKind::Source => NodeBehavior::Source(SourceState {
                item: ResourceKind::new("A"),
                production_interval_ms: DEFAULT_PRODUCTION_INTERVAL_MS,
                last_production_ms: now_ms,
                sale_price: DEFAULT_SOURCE_SALE_PRICE,
            }),
            NodeKind::Warehouse => NodeBehavior::Warehouse,
            NodeKind::Transformer => NodeBehavior::Transformer(TransformerState {
                input: ResourceKind::new("A"),
                output: ResourceKind::new("B"),
                duration_ms: DEFAULT_TRANSFORM_DURATION_MS,
                processing: false,
                last_transform_ms: now_ms,
            }),
            NodeKind::Sink => NodeBehavior::Sink,
            NodeKind::Store => NodeBehavior::Store(StoreState {
                influence_radius_m: DEFAULT_INFLUENCE_RADIUS_M,
                generation_interval_ms: DEFAULT_GENERATION_INTERVAL_MS,
                last_generation_ms: now_ms,
                attention_capacity: DEFAULT_ATTENTION_CAPACITY,
                attending: BTreeSet::new(),
            }),
            NodeKind::Generic => NodeBehavior::Generic,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeBehavior::Source(_) => NodeKind::Source,
            NodeBehavior::Warehouse => NodeKind::Warehouse,
            NodeBehavior::Transformer(_) => NodeKind::Transformer,
            NodeBehavior::Sink => NodeKind::Sink,
            NodeBehavior::Store(_) => NodeKind::Store,
            NodeBehavior::Generic => NodeKind::Generic,
        }
    }
}

/// A property change requested from outside the tick
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEdit {
    Size(f64),
    /// Override the kind's default capacity; `None` = unbounded
    InventoryCapacity(Option<u32>),
    SourceItem(ResourceKind),
    ProductionInterval(f64),
    TransformInput(ResourceKind),
    TransformOutput(ResourceKind),
    TransformDuration(f64),
    InfluenceRadius(f64),
    GenerationInterval(f64),
    AttentionCapacity(usize),
}

impl NodeEdit {
    /// The numeric value carried by size, radius and timing edits
    fn amount(&self) -> Option<f64> {
        match self {
            NodeEdit::Size(value)
            | NodeEdit::ProductionInterval(value)
            | NodeEdit::TransformDuration(value)
            | NodeEdit::InfluenceRadius(value)
            | NodeEdit::GenerationInterval(value) => Some(*value),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            NodeEdit::Size(_) => "size",
            NodeEdit::InventoryCapacity(_) => "inventory capacity",
            NodeEdit::SourceItem(_) => "source item",
            NodeEdit::ProductionInterval(_) => "production interval",
            NodeEdit::TransformInput(_) => "transform input",
            NodeEdit::TransformOutput(_) => "transform output",
            NodeEdit::TransformDuration(_) => "transform duration",
            NodeEdit::InfluenceRadius(_) => "influence radius",
            NodeEdit::GenerationInterval(_) => "generation interval",
            NodeEdit::AttentionCapacity(_) => "attention capacity",
        }
    }
}

/// What a production or transformation step did this tick
#[derive(Debug, Clone, PartialEq)]
pub enum NodeUpdateResult {
    Idle,
    Produced { kind: ResourceKind, stored: bool },
    TransformStarted { input: ResourceKind },
    Transformed { output: ResourceKind, stored: bool },
}

/// A facility on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimNode {
    pub id: NodeId,
    pub position: GeoPoint,
    pub size: f64,
    pub inventory: Inventory,
    /// Permanent paths touching this node
    pub path_ids: BTreeSet<PathId>,
    /// Vehicles docked here, in arrival order
    pub fleet: Vec<VehicleId>,
    pub selected: bool,
    pub behavior: NodeBehavior,
}

impl SimNode {
    pub fn new(id: NodeId, position: GeoPoint, kind: NodeKind, now_ms: f64) -> Self {
        Self {
            id,
            position,
            size: DEFAULT_NODE_SIZE,
            inventory: Inventory::with_capacity(kind.default_capacity()),
            path_ids: BTreeSet::new(),
            fleet: Vec::new(),
            selected: false,
            behavior: NodeBehavior::for_kind(kind, now_ms),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.behavior.kind()
    }

    /// Switch to another kind. Capacity follows the new kind and units that no
    /// longer fit are dropped; returns how many were dropped.
    pub fn set_kind(&mut self, kind: NodeKind, now_ms: f64) -> u32 {
        if kind != self.kind() {
            self.behavior = NodeBehavior::for_kind(kind, now_ms);
        }
        self.inventory.set_capacity(kind.default_capacity())
    }

    /// Apply a property edit. Returns how many units a capacity edit dropped.
    pub fn apply_edit(&mut self, edit: NodeEdit) -> Result<u32, SimError> {
        if let Some(value) = edit.amount() {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::InvalidEditValue {
                    edit: edit.name(),
                    value,
                });
            }
        }
        let kind = self.kind();
        let invalid = SimError::InvalidEdit {
            edit: edit.name(),
            kind,
        };
        match (edit, &mut self.behavior) {
            (NodeEdit::Size(size), _) => self.size = size,
            (NodeEdit::InventoryCapacity(capacity), _) => {
                return Ok(self.inventory.set_capacity(capacity));
            }
            (NodeEdit::SourceItem(item), NodeBehavior::Source(source)) => source.item = item,
            (NodeEdit::ProductionInterval(ms), NodeBehavior::Source(source)) => {
                source.production_interval_ms = ms
            }
            (NodeEdit::TransformInput(input), NodeBehavior::Transformer(t)) => t.input = input,
            (NodeEdit::TransformOutput(output), NodeBehavior::Transformer(t)) => t.output = output,
            (NodeEdit::TransformDuration(ms), NodeBehavior::Transformer(t)) => t.duration_ms = ms,
            (NodeEdit::InfluenceRadius(r), NodeBehavior::Store(store)) => {
                store.influence_radius_m = r
            }
            (NodeEdit::GenerationInterval(ms), NodeBehavior::Store(store)) => {
                store.generation_interval_ms = ms
            }
            (NodeEdit::AttentionCapacity(n), NodeBehavior::Store(store)) => {
                store.attention_capacity = n
            }
            _ => return Err(invalid),
        }
        Ok(0)
    }

    /// Source production step
    pub fn produce(&mut self, now_ms: f64) -> NodeUpdateResult {
        let NodeBehavior::Source(source) = &mut self.behavior else {
            return NodeUpdateResult::Idle;
        };
        if now_ms - source.last_production_ms < source.production_interval_ms {
            return NodeUpdateResult::Idle;
        }

        source.last_production_ms = now_ms;
        let kind = source.item.clone();
        let stored = self.inventory.store_one(&kind);
        NodeUpdateResult::Produced { kind, stored }
    }

    /// Transformer step: start a unit when idle, finish it once the duration
    /// has elapsed. One unit in flight at a time.
    pub fn transform(&mut self, now_ms: f64) -> NodeUpdateResult {
        let NodeBehavior::Transformer(t) = &mut self.behavior else {
            return NodeUpdateResult::Idle;
        };

        if t.processing {
            if now_ms - t.last_transform_ms < t.duration_ms {
                return NodeUpdateResult::Idle;
            }
            t.processing = false;
            // Input vanished mid-cycle (e.g. picked up by an order): no output
            if self.inventory.count(&t.input) == 0 {
                return NodeUpdateResult::Idle;
            }
            let output = t.output.clone();
            self.inventory
                .consume(&[(t.input.clone(), 1)].into_iter().collect());
            let stored = self.inventory.store_one(&output);
            NodeUpdateResult::Transformed { output, stored }
        } else if self.inventory.count(&t.input) >= 1 {
            t.processing = true;
            t.last_transform_ms = now_ms;
            NodeUpdateResult::TransformStarted {
                input: t.input.clone(),
            }
        } else {
            NodeUpdateResult::Idle
        }
    }

    pub fn store_state(&self) -> Option<&StoreState> {
        match &self.behavior {
            NodeBehavior::Store(store) => Some(store),
            _ => None,
        }
    }

    pub fn store_state_mut(&mut self) -> Option<&mut StoreState> {
        match &mut self.behavior {
            NodeBehavior::Store(store) => Some(store),
            _ => None,
        }
    }

    pub fn add_to_fleet(&mut self, vehicle: VehicleId) {
        if !self.fleet.contains(&vehicle) {
            self.fleet.push(vehicle);
        }
    }

    pub fn remove_from_fleet(&mut self, vehicle: VehicleId) {
        self.fleet.retain(|v| *v != vehicle);
    }
}
