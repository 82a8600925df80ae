//! Shared types for orders

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Channel
// ============================================================================

/// Service channel, fixed at creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderChannel {
    /// Dine-in, served at a table
    #[default]
    TableService,
    /// Picked up at the counter
    Takeaway,
    Delivery,
}

// ============================================================================
// Line Items
// ============================================================================

/// Add-on selected for a line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddOn {
    pub name: String,
    #[serde(default)]
    pub price: Decimal,
}

/// Order line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub quantity: i32,
    pub unit_price: Decimal,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_ons: Vec<AddOn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl LineItem {
    pub fn new(product_name: impl Into<String>, quantity: i32, unit_price: Decimal) -> Self {
        Self {
            quantity,
            unit_price,
            product_name: product_name.into(),
            add_ons: Vec::new(),
            note: None,
        }
    }

    /// quantity × (unit price + add-ons)
    pub fn line_total(&self) -> Decimal {
        let add_ons: Decimal = self.add_ons.iter().map(|a| a.price).sum();
        (self.unit_price + add_ons) * Decimal::from(self.quantity)
    }
}

// ============================================================================
// Totals
// ============================================================================

/// Monetary breakdown, computed by the persistence side and stored as-is
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub service_charge: Decimal,
    #[serde(default)]
    pub packaging_charge: Decimal,
    #[serde(default)]
    pub tip: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    pub total: Decimal,
}
