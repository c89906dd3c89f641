//! Catalog product read projection.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A product as seen by checkout.
///
/// Owned by the catalog. Checkout only reads it and, for tracked products,
/// decrements `available_quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub available_quantity: i64,
    pub tracks_quantity: bool,
    pub is_active: bool,
}

impl Product {
    /// Creates an active, quantity-tracked product with no stock.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            available_quantity: 0,
            tracks_quantity: true,
            is_active: true,
        }
    }

    /// Sets the available stock.
    pub fn with_stock(mut self, available_quantity: i64) -> Self {
        self.available_quantity = available_quantity;
        self
    }

    /// Marks the product as always available (stock is not tracked).
    pub fn untracked(mut self) -> Self {
        self.tracks_quantity = false;
        self
    }

    /// Marks the product as not for sale.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Returns true if `quantity` units can be sold from current stock.
    pub fn can_supply(&self, quantity: u32) -> bool {
        !self.tracks_quantity || self.available_quantity >= i64::from(quantity)
    }
}
