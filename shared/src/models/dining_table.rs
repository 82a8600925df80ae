//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Table occupancy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableOccupancy {
    #[default]
    Free,
    Occupied,
}

/// Dining table entity, referenced (not owned) by table-service orders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiningTable {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub occupancy: TableOccupancy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_order_id: Option<String>,
}

impl DiningTable {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            occupancy: TableOccupancy::Free,
            active_order_id: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.occupancy == TableOccupancy::Free
    }

    /// Seat an order at this table
    pub fn occupy(&mut self, order_id: impl Into<String>) {
        self.occupancy = TableOccupancy::Occupied;
        self.active_order_id = Some(order_id.into());
    }

    /// Free the table. Returns false if it was already free.
    pub fn release(&mut self) -> bool {
        let was_occupied = !self.is_free();
        self.occupancy = TableOccupancy::Free;
        self.active_order_id = None;
        was_occupied
    }
}
