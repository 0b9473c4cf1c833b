//! Events emitted by the simulation
//!
//! Commands and tick phases push [`SimEvent`]s; the world hands them to every
//! registered [`SimObserver`] and keeps them in an outbox until drained.

use std::cell::RefCell;
use std::rc::Rc;

use super::node::NodeKind;
use super::order::OrderStatus;
use super::types::{ClientId, GeoPoint, NodeId, OrderId, PathId, ResourceKind, VehicleId};
use super::vehicle::MissionKind;

/// Colour of the floating text shown when money comes in
pub const MONEY_EFFECT_COLOR: &str = "#00FF00";
/// Colour of the marker shown when a client gives up
pub const ABANDON_EFFECT_COLOR: &str = "#FF4136";

/// Short-lived floating text for the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct VisualEffect {
    pub text: String,
    pub color: String,
    pub position: GeoPoint,
    /// Simulation time the effect starts, ms
    pub start_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    NodeAdded(NodeId),
    NodeRemoved(NodeId),
    NodeMoved(NodeId),
    NodeChanged(NodeId),
    NodeKindChanged { node: NodeId, kind: NodeKind },
    PathAdded(PathId),
    PathRemoved(PathId),
    SelectionChanged,
    ProductionToggled(bool),
    MoneyChanged(f64),
    ItemProduced { node: NodeId, kind: ResourceKind, stored: bool },
    ItemTransformed { node: NodeId, output: ResourceKind, stored: bool },
    OrderCreated(OrderId),
    OrderStatusChanged { order: OrderId, from: OrderStatus, to: OrderStatus },
    VehicleAdded(VehicleId),
    VehicleLaunched { vehicle: VehicleId, mission: MissionKind, path: PathId },
    VehicleDocked { vehicle: VehicleId, node: NodeId },
    VehicleReleased { vehicle: VehicleId, at: GeoPoint },
    ClientSpawned { client: ClientId, store: NodeId },
    ClientServed { client: ClientId, store: NodeId, revenue: f64 },
    ClientAbandoned(ClientId),
    Effect(VisualEffect),
    StateImported,
    StateCleared,
    /// A tick or command finished; a fresh snapshot is available
    StateChanged,
}

/// Something outside the core that wants to hear about changes
/// (renderer, UI panels, stats)
pub trait SimObserver {
    fn on_event(&mut self, event: &SimEvent);
}

/// Observer that just keeps everything it hears
#[derive(Debug, Default)]
pub struct EventRecorder {
    pub events: Vec<SimEvent>,
}

impl SimObserver for EventRecorder {
    fn on_event(&mut self, event: &SimEvent) {
        self.events.push(event.clone());
    }
}

/// Lets a caller keep a handle on an observer after registering it
impl<T: SimObserver> SimObserver for Rc<RefCell<T>> {
    fn on_event(&mut self, event: &SimEvent) {
        self.borrow_mut().on_event(event);
    }
}

pub(crate) fn money_effect(amount: f64, position: GeoPoint, now_ms: f64) -> SimEvent {
    SimEvent::Effect(VisualEffect {
        text: format!("+${}", amount.floor()),
        color: MONEY_EFFECT_COLOR.to_string(),
        position,
        start_time_ms: now_ms,
    })
}

pub(crate) fn abandon_effect(position: GeoPoint, now_ms: f64) -> SimEvent {
    SimEvent::Effect(VisualEffect {
        text: "X".to_string(),
        color: ABANDON_EFFECT_COLOR.to_string(),
        position,
        start_time_ms: now_ms,
    })
}
