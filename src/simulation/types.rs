//! Core types for the logistics simulation
//!
//! Identifiers, geographic points and item bookkeeping shared by every entity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Mean earth radius used for great-circle distances, in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude, used for small local offsets
pub const METERS_PER_DEGREE: f64 = 111_111.0;

/// A unique identifier for simulation entities
/// This is a simple wrapper around a u64 for type safety
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimId(pub u64);

macro_rules! sim_id_wrapper {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub SimId);

        impl $name {
            pub fn raw(self) -> u64 {
                self.0 .0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0 .0)
            }
        }
    };
}

sim_id_wrapper!(
    /// A wrapper type for node IDs
    NodeId
);
sim_id_wrapper!(
    /// A wrapper type for path IDs
    PathId
);
sim_id_wrapper!(
    /// A wrapper type for vehicle IDs
    VehicleId
);
sim_id_wrapper!(
    /// A wrapper type for client IDs
    ClientId
);
sim_id_wrapper!(
    /// A wrapper type for order IDs
    OrderId
);
sim_id_wrapper!(
    /// Handle for an outstanding routing request
    RouteTicket
);

/// A geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance in meters (haversine)
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lng - self.lng).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    pub fn lerp(&self, other: &GeoPoint, t: f64) -> GeoPoint {
        GeoPoint {
            lat: self.lat + (other.lat - self.lat) * t,
            lng: self.lng + (other.lng - self.lng) * t,
        }
    }

    /// Offset this point by `radius_m` meters in the direction `angle` (radians,
    /// 0 = north). Uses the flat-earth approximation, fine for a few kilometers.
    pub fn offset_m(&self, radius_m: f64, angle: f64) -> GeoPoint {
        let d_lat = radius_m * angle.cos() / METERS_PER_DEGREE;
        let d_lng = radius_m * angle.sin() / (METERS_PER_DEGREE * self.lat.to_radians().cos());
        GeoPoint {
            lat: self.lat + d_lat,
            lng: self.lng + d_lng,
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}

/// A named kind of resource (e.g. "A")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKind(pub String);

impl ResourceKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKind {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Resource kind -> count. Ordered so iteration is deterministic.
pub type ItemSet = BTreeMap<ResourceKind, u32>;

/// Build an item set from `(kind, count)` pairs, merging duplicates
pub fn items<'a>(pairs: impl IntoIterator<Item = (&'a str, u32)>) -> ItemSet {
    let mut set = ItemSet::new();
    for (kind, count) in pairs {
        let entry = set.entry(ResourceKind::new(kind)).or_insert(0);
        *entry = entry.saturating_add(count);
    }
    set
}

/// Sum of all counts in an item set, saturating at `u32::MAX`
pub fn item_total(set: &ItemSet) -> u32 {
    set.values().fold(0u32, |total, count| total.saturating_add(*count))
}

/// Bounded resource storage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    items: ItemSet,
    /// `None` means unbounded
    capacity: Option<u32>,
}

impl Inventory {
    pub fn with_capacity(capacity: Option<u32>) -> Self {
        Self {
            items: ItemSet::new(),
            capacity,
        }
    }

    pub fn items(&self) -> &ItemSet {
        &self.items
    }

    pub fn capacity(&self) -> Option<u32> {
        self.capacity
    }

    pub fn count(&self, kind: &ResourceKind) -> u32 {
        self.items.get(kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        item_total(&self.items)
    }

    pub fn free_space(&self) -> u32 {
        match self.capacity {
            Some(capacity) => capacity.saturating_sub(self.total()),
            None => u32::MAX - self.total(),
        }
    }

    pub fn has_enough(&self, wanted: &ItemSet) -> bool {
        wanted
            .iter()
            .all(|(kind, count)| self.count(kind) >= *count)
    }

    /// Deposit as much of `incoming` as fits, kind by kind.
    /// Returns what was actually stored; everything else is dropped.
    pub fn store(&mut self, incoming: &ItemSet) -> ItemSet {
        let mut stored = ItemSet::new();
        for (kind, count) in incoming {
            let amount = (*count).min(self.free_space());
            if amount > 0 {
                *self.items.entry(kind.clone()).or_insert(0) += amount;
                stored.insert(kind.clone(), amount);
            }
        }
        stored
    }

    /// Store a single unit. Returns false when there was no room.
    pub fn store_one(&mut self, kind: &ResourceKind) -> bool {
        if self.free_space() == 0 {
            return false;
        }
        *self.items.entry(kind.clone()).or_insert(0) += 1;
        true
    }

    /// Remove `outgoing` from the inventory. Counts saturate at zero and empty
    /// entries are dropped; callers check `has_enough` first.
    pub fn consume(&mut self, outgoing: &ItemSet) {
        for (kind, count) in outgoing {
            if let Some(held) = self.items.get_mut(kind) {
                *held = held.saturating_sub(*count);
                if *held == 0 {
                    self.items.remove(kind);
                }
            }
        }
    }

    /// Change the capacity, dropping units that no longer fit.
    /// Largest holdings are trimmed first.
    pub fn set_capacity(&mut self, capacity: Option<u32>) -> u32 {
        self.capacity = capacity;
        let Some(capacity) = capacity else {
            return 0;
        };

        let mut dropped = 0;
        while self.total() > capacity {
            let largest = self
                .items
                .iter()
                .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then(kb.cmp(ka)))
                .map(|(kind, _)| kind.clone());
            let Some(kind) = largest else { break };
            let excess = self.total() - capacity;
            let held = self.count(&kind);
            let trim = excess.min(held);
            self.consume(&ItemSet::from([(kind, trim)]));
            dropped += trim;
        }
        dropped
    }
}
