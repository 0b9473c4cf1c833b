//! Error types for simulation commands
//!
//! Ticks never fail; these only come back from explicit commands.

use super::node::NodeKind;
use super::order::OrderStatus;
use super::types::{NodeId, OrderId, PathId, VehicleId};
use super::vehicle::VehicleStatus;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("path {0} not found")]
    PathNotFound(PathId),
    #[error("vehicle {0} not found")]
    VehicleNotFound(VehicleId),
    #[error("vehicle {vehicle} is {actual:?}, expected {expected:?}")]
    InvalidVehicleStatus {
        vehicle: VehicleId,
        expected: VehicleStatus,
        actual: VehicleStatus,
    },
    #[error("vehicle {0} is already waiting for a route")]
    VehicleBusy(VehicleId),
    #[error("vehicle {vehicle} cannot take {requested} more units (carrying {carried} of {capacity})")]
    CapacityExceeded {
        vehicle: VehicleId,
        requested: u32,
        carried: u32,
        capacity: u32,
    },
    #[error("a {from:?} node cannot be connected to a {to:?} node")]
    ConnectionNotAllowed { from: NodeKind, to: NodeKind },
    #[error("node {node} cannot connect to itself")]
    SelfConnection { node: NodeId },
    #[error("edit {edit} does not apply to a {kind:?} node")]
    InvalidEdit { edit: &'static str, kind: NodeKind },
    #[error("{edit} must be a finite, non-negative number, got {value}")]
    InvalidEditValue { edit: &'static str, value: f64 },
    #[error("order must request at least one item")]
    EmptyOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("order {order} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        order: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },
}
