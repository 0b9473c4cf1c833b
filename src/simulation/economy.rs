//! Money and service counters
//!
//! Tracks the currency balance credited by served clients plus running totals
//! of what happened to clients and orders.

use serde::{Deserialize, Serialize};

/// Starting balance of a new world
pub const STARTING_MONEY: f64 = 1_000_000.0;

/// Balance after clearing the world
pub const RESET_MONEY: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Economy {
    pub money: f64,

    /// Clients served from store inventory
    pub clients_served: u64,

    /// Clients that ran out of patience
    pub clients_abandoned: u64,

    /// Orders dropped off at their requester
    pub deliveries_completed: u64,

    /// Orders rejected because the provider disappeared
    pub orders_rejected: u64,

    /// Units lost to full inventories
    pub units_discarded: u64,
}

impl Default for Economy {
    fn default() -> Self {
        Self::new(STARTING_MONEY)
    }
}

impl Economy {
    pub fn new(money: f64) -> Self {
        Self {
            money,
            clients_served: 0,
            clients_abandoned: 0,
            deliveries_completed: 0,
            orders_rejected: 0,
            units_discarded: 0,
        }
    }

    /// Add money from revenue
    pub fn earn(&mut self, amount: f64) {
        self.money += amount;
    }

    /// Record a served client and credit the sale
    pub fn record_sale(&mut self, amount: f64) {
        self.clients_served += 1;
        self.earn(amount);
    }

    pub fn record_abandonment(&mut self) {
        self.clients_abandoned += 1;
    }

    pub fn record_delivery(&mut self) {
        self.deliveries_completed += 1;
    }

    pub fn record_rejection(&mut self) {
        self.orders_rejected += 1;
    }

    pub fn record_discard(&mut self, units: u32) {
        self.units_discarded += u64::from(units);
    }

    /// Share of finished clients that were served, in percent
    pub fn service_rate(&self) -> f64 {
        let finished = self.clients_served + self.clients_abandoned;
        if finished == 0 {
            return 0.0;
        }
        self.clients_served as f64 / finished as f64 * 100.0
    }

    /// Get a summary string for display
    pub fn summary(&self) -> String {
        format!(
            "Money: ${:.0} | Clients served: {} | Abandoned: {} | Deliveries: {} | Rejected: {}",
            self.money,
            self.clients_served,
            self.clients_abandoned,
            self.deliveries_completed,
            self.orders_rejected
        )
    }
}
