//! Headless logistics simulation
//!
//! Nodes produce, transform and sell resources; vehicles carry orders between
//! them along routed paths; clients appear around stores and wait to be
//! served. Everything here runs without a renderer and can be driven and
//! tested from the console.

mod catalog;
mod client;
mod config;
mod economy;
mod error;
mod events;
mod fleet;
mod node;
mod node_logic;
mod order;
mod path;
mod persistence;
mod rng;
mod routing;
mod snapshot;
mod state;
mod types;
mod vehicle;
mod world;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use catalog::{ResourceCatalog, ResourceType};
#[allow(unused_imports)]
pub use client::{SimClient, BASE_PATIENCE_MS, PATIENCE_JITTER_MS};
#[allow(unused_imports)]
pub use config::{
    SimConfig, EXPEL_RADIUS_M, MAX_CLIENTS_PER_BATCH, MIN_CLIENT_RADIUS_M,
    NODE_LOOKUP_THRESHOLD_M, ROUTE_SNAP_DISTANCE_M,
};
#[allow(unused_imports)]
pub use economy::{Economy, RESET_MONEY, STARTING_MONEY};
#[allow(unused_imports)]
pub use error::{OrderError, SimError};
#[allow(unused_imports)]
pub use events::{
    EventRecorder, SimEvent, SimObserver, VisualEffect, ABANDON_EFFECT_COLOR, MONEY_EFFECT_COLOR,
};
#[allow(unused_imports)]
pub use node::{
    NodeBehavior, NodeEdit, NodeKind, NodeUpdateResult, SimNode, SourceState, StoreState,
    TransformerState, STORE_CAPACITY, TRANSFORMER_CAPACITY, WAREHOUSE_CAPACITY,
};
#[allow(unused_imports)]
pub use node_logic::MAX_DEMAND_KINDS;
#[allow(unused_imports)]
pub use order::{Order, OrderStatus};
#[allow(unused_imports)]
pub use path::{kmh_to_ms, Path, PathEnd, RouteData, Segment};
#[allow(unused_imports)]
pub use persistence::{PersistenceError, SaveData, SAVE_VERSION};
#[allow(unused_imports)]
pub use routing::{
    resolve_route, NetworkRouter, PathNetwork, RouteError, RoutePurpose, RouteQueue,
    RouteRequest, Router, StraightLineRouter,
};
#[allow(unused_imports)]
pub use snapshot::{ClientView, NodeView, PathView, VehicleView, WorldSnapshot};
#[allow(unused_imports)]
pub use state::{IdCounters, SimState};
#[allow(unused_imports)]
pub use types::{
    item_total, items, ClientId, GeoPoint, Inventory, ItemSet, NodeId, OrderId, PathId,
    ResourceKind, RouteTicket, SimId, VehicleId,
};
#[allow(unused_imports)]
pub use vehicle::{
    Mission, MissionKind, MissionTarget, SimVehicle, VehicleKind, VehicleStatus,
    VehicleUpdateResult, DEFAULT_SPEED_FACTOR,
};
pub use world::SimWorld;
