//! Vehicle movement logic for the logistics simulation
//!
//! A vehicle is docked at a node, free on the map, or on a mission following a
//! path segment by segment. Arrival handling is left to the caller, which
//! knows about nodes and orders.

use serde::{Deserialize, Serialize};

use super::error::SimError;
use super::path::Path;
use super::types::{item_total, GeoPoint, ItemSet, NodeId, OrderId, PathId, RouteTicket, VehicleId};

/// Map speed multiplier applied on top of each kind's base speed
pub const DEFAULT_SPEED_FACTOR: f64 = 20.0;

/// Type of vehicle in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleKind {
    Moto,
    Van,
    Truck,
}

impl VehicleKind {
    /// Units of cargo it can carry
    pub fn capacity(self) -> u32 {
        match self {
            VehicleKind::Moto => 5,
            VehicleKind::Van => 30,
            VehicleKind::Truck => 150,
        }
    }

    /// Speed before the map speed factor, km/h
    pub fn base_speed_kmh(self) -> f64 {
        match self {
            VehicleKind::Moto => 80.0,
            VehicleKind::Van => 50.0,
            VehicleKind::Truck => 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleStatus {
    /// Parked at its home node, not drawn on the map
    Docked,
    /// Idle on the map, not attached to a node
    Free,
    /// Following a path
    OnMission,
}

/// The type of trip a vehicle is making
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionKind {
    /// Carrying an order to its requester
    Deliver,
    /// Heading back to the home node after a delivery
    Return,
    /// Relocating to a node to dock there
    Assign,
    /// Relocating to a free point
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MissionTarget {
    Node(NodeId),
    Point(GeoPoint),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub order: Option<OrderId>,
    pub kind: MissionKind,
    pub target: MissionTarget,
}

impl Mission {
    pub fn target_node(&self) -> Option<NodeId> {
        match self.target {
            MissionTarget::Node(id) => Some(id),
            MissionTarget::Point(_) => None,
        }
    }
}

/// Result of a vehicle update indicating what action should be taken
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleUpdateResult {
    /// Not on a mission, nothing to do
    Idle,
    /// Still travelling
    Moving,
    /// Reached the end of its path at this point
    Arrived(GeoPoint),
}

/// A vehicle in the logistics simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimVehicle {
    pub id: VehicleId,
    pub kind: VehicleKind,
    pub capacity: u32,
    pub speed_factor: f64,
    /// `None` while docked
    pub position: Option<GeoPoint>,
    pub cargo: ItemSet,
    pub status: VehicleStatus,
    pub home_node: Option<NodeId>,
    pub path_id: Option<PathId>,
    pub segment_index: usize,
    pub segment_elapsed_ms: f64,
    pub mission: Option<Mission>,
    pub selected: bool,
    /// Set while a route for this vehicle's next mission is being resolved
    pub pending_route: Option<RouteTicket>,
}

impl SimVehicle {
    pub fn new(id: VehicleId, kind: VehicleKind, speed_factor: f64) -> Self {
        Self {
            id,
            kind,
            capacity: kind.capacity(),
            speed_factor,
            position: None,
            cargo: ItemSet::new(),
            status: VehicleStatus::Docked,
            home_node: None,
            path_id: None,
            segment_index: 0,
            segment_elapsed_ms: 0.0,
            mission: None,
            selected: false,
            pending_route: None,
        }
    }

    pub fn speed_kmh(&self) -> f64 {
        self.kind.base_speed_kmh() * self.speed_factor
    }

    pub fn cargo_total(&self) -> u32 {
        item_total(&self.cargo)
    }

    pub fn can_carry(&self, items: &ItemSet) -> bool {
        self.cargo_total().saturating_add(item_total(items)) <= self.capacity
    }

    /// Docked or free, and not already promised to another trip
    pub fn is_idle(&self) -> bool {
        matches!(self.status, VehicleStatus::Docked | VehicleStatus::Free)
            && self.pending_route.is_none()
    }

    pub fn is_visible(&self) -> bool {
        self.status != VehicleStatus::Docked
    }

    /// Load cargo. All or nothing: refused if it would exceed capacity.
    pub fn load(&mut self, items: &ItemSet) -> Result<(), SimError> {
        if !self.can_carry(items) {
            return Err(SimError::CapacityExceeded {
                vehicle: self.id,
                requested: item_total(items),
                carried: self.cargo_total(),
                capacity: self.capacity,
            });
        }
        for (kind, count) in items {
            *self.cargo.entry(kind.clone()).or_insert(0) += count;
        }
        Ok(())
    }

    /// Empty the cargo hold, returning what was in it
    pub fn unload_all(&mut self) -> ItemSet {
        std::mem::take(&mut self.cargo)
    }

    fn clear_mission(&mut self) {
        self.path_id = None;
        self.mission = None;
        self.segment_index = 0;
        self.segment_elapsed_ms = 0.0;
    }

    /// Park at a node, which becomes its home
    pub fn dock(&mut self, node: NodeId) {
        self.status = VehicleStatus::Docked;
        self.home_node = Some(node);
        self.position = None;
        self.pending_route = None;
        self.clear_mission();
    }

    /// Start following a path
    pub fn launch(&mut self, path: PathId, start: GeoPoint, mission: Mission) {
        self.status = VehicleStatus::OnMission;
        self.path_id = Some(path);
        self.position = Some(start);
        self.segment_index = 0;
        self.segment_elapsed_ms = 0.0;
        self.mission = Some(mission);
        self.pending_route = None;
    }

    /// Let the vehicle loose at a point with no home
    pub fn release(&mut self, at: GeoPoint) {
        self.status = VehicleStatus::Free;
        self.home_node = None;
        self.position = Some(at);
        self.pending_route = None;
        self.clear_mission();
    }

    /// Stop at a point keeping the home node, waiting for the next route
    pub fn hold(&mut self, at: GeoPoint, ticket: RouteTicket) {
        self.status = VehicleStatus::Free;
        self.position = Some(at);
        self.clear_mission();
        self.pending_route = Some(ticket);
    }

    /// Advance along `path` by `delta_ms`.
    /// Returns Arrived once the last segment is exhausted; the position is
    /// never reported past the final endpoint.
    pub fn advance(&mut self, delta_ms: f64, path: &Path) -> VehicleUpdateResult {
        if self.status != VehicleStatus::OnMission {
            return VehicleUpdateResult::Idle;
        }

        let segments = &path.segments;
        if self.segment_index >= segments.len() {
            let end = path
                .last_point()
                .or(self.position)
                .unwrap_or_default();
            self.position = Some(end);
            return VehicleUpdateResult::Arrived(end);
        }

        let speed = self.speed_kmh();
        self.segment_elapsed_ms += delta_ms;

        let mut segment = segments[self.segment_index];
        let mut travel_ms = segment.travel_time_ms(speed);

        while self.segment_elapsed_ms >= travel_ms {
            self.segment_elapsed_ms -= travel_ms;
            self.segment_index += 1;

            if self.segment_index >= segments.len() {
                self.position = Some(segment.end);
                return VehicleUpdateResult::Arrived(segment.end);
            }

            segment = segments[self.segment_index];
            travel_ms = segment.travel_time_ms(speed);
        }

        // Interpolate position along current segment
        let progress = if travel_ms > 0.0 {
            self.segment_elapsed_ms / travel_ms
        } else {
            0.0
        };
        self.position = Some(segment.point_at(progress));

        VehicleUpdateResult::Moving
    }
}
