//! Orders: one node asking another for a set of items

use serde::{Deserialize, Serialize};

use super::error::OrderError;
use super::types::{item_total, ItemSet, NodeId, OrderId, VehicleId};

/// Lifecycle of an order. Variants are declared in the only order they may be
/// visited; `Rejected` is reachable from `Pending` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Waiting for stock and a vehicle at the provider
    Pending,
    /// Loaded and assigned, route being resolved
    EnRoute,
    /// Vehicle driving to the requester
    Delivering,
    /// Requester vanished before drop-off, goods heading back to the provider.
    /// Becomes `Completed` when that return trip ends.
    Returning,
    Completed,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Rejected)
    }

    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        match (self, next) {
            (OrderStatus::Pending, OrderStatus::Rejected) => true,
            (_, OrderStatus::Rejected) => false,
            (from, to) => !from.is_terminal() && to > from,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub requester: NodeId,
    pub provider: NodeId,
    pub items: ItemSet,
    pub status: OrderStatus,
    pub assigned_vehicle: Option<VehicleId>,
    /// Simulation time at creation, ms
    pub created_at_ms: f64,
}

impl Order {
    pub fn new(
        id: OrderId,
        requester: NodeId,
        provider: NodeId,
        items: ItemSet,
        created_at_ms: f64,
    ) -> Self {
        Self {
            id,
            requester,
            provider,
            items,
            status: OrderStatus::Pending,
            assigned_vehicle: None,
            created_at_ms,
        }
    }

    pub fn total_items(&self) -> u32 {
        item_total(&self.items)
    }

    /// Move forward to `next`. Backward moves, repeats and leaving a terminal
    /// state are refused.
    pub fn advance(&mut self, next: OrderStatus) -> Result<OrderStatus, OrderError> {
        if !self.status.can_advance_to(next) {
            return Err(OrderError::InvalidTransition {
                order: self.id,
                from: self.status,
                to: next,
            });
        }
        let previous = self.status;
        self.status = next;
        Ok(previous)
    }

    /// Pending -> EnRoute with the vehicle that carries it
    pub fn assign(&mut self, vehicle: VehicleId) -> Result<(), OrderError> {
        self.advance(OrderStatus::EnRoute)?;
        self.assigned_vehicle = Some(vehicle);
        Ok(())
    }
}
