//! Resource catalog: which kinds exist and what they sell for

use serde::{Deserialize, Serialize};

use super::types::{ItemSet, ResourceKind};

/// A tradeable resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceType {
    pub kind: ResourceKind,
    /// Sale price per unit when a client is served
    pub price: f64,
    pub difficulty: f64,
    /// Display colour, CSS hex
    pub color: String,
}

impl ResourceType {
    pub fn new(kind: &str, price: f64, difficulty: f64, color: &str) -> Self {
        Self {
            kind: ResourceKind::new(kind),
            price,
            difficulty,
            color: color.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCatalog {
    types: Vec<ResourceType>,
}

impl Default for ResourceCatalog {
    fn default() -> Self {
        Self {
            types: vec![
                ResourceType::new("A", 1000.0, 1.0, "#aa0000"),
                ResourceType::new("B", 2000.0, 1.5, "#00aa00"),
                ResourceType::new("C", 9000.0, 2.0, "#1212aa"),
                ResourceType::new("D", 3000.0, 3.0, "#aaaa00"),
                ResourceType::new("E", 4000.0, 4.0, "#00aaaa"),
            ],
        }
    }
}

impl ResourceCatalog {
    pub fn new(types: Vec<ResourceType>) -> Self {
        Self { types }
    }

    pub fn get(&self, kind: &ResourceKind) -> Option<&ResourceType> {
        self.types.iter().find(|t| &t.kind == kind)
    }

    pub fn kinds(&self) -> Vec<ResourceKind> {
        self.types.iter().map(|t| t.kind.clone()).collect()
    }

    /// Unit price, zero for kinds not in the catalog
    pub fn price(&self, kind: &ResourceKind) -> f64 {
        self.get(kind).map(|t| t.price).unwrap_or(0.0)
    }

    /// Total sale value of an item set
    pub fn value_of(&self, items: &ItemSet) -> f64 {
        items
            .iter()
            .map(|(kind, count)| self.price(kind) * f64::from(*count))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
