//! Cart validation against a product snapshot.

use std::collections::HashMap;

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::error::RejectionReason;
use crate::money::Money;
use crate::product::Product;

/// Largest quantity of one product a single order may hold.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

/// Largest subtotal a single order may reach, in cents.
const MAX_SUBTOTAL_CENTS: i64 = 1_000_000_000_000;

/// One product-and-quantity pair from a checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineItemRequest {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A line item whose price has been fixed from the catalog.
///
/// `unit_price_at_purchase` is captured at validation time and never
/// recomputed, so later catalog price changes cannot affect the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedLineItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_at_purchase: Money,
    pub line_total: Money,
}

/// A stock decrement computed during validation.
///
/// `new_quantity` is what the stock will be if nothing else touches the
/// product before the adjustment is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryAdjustment {
    pub product_id: ProductId,
    pub quantity: u32,
    pub new_quantity: i64,
}

/// Output of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCart {
    items: Vec<ValidatedLineItem>,
    adjustments: Vec<InventoryAdjustment>,
}

impl ValidatedCart {
    /// Returns the validated line items in request order.
    pub fn items(&self) -> &[ValidatedLineItem] {
        &self.items
    }

    /// Returns stock decrements for quantity-tracked products only.
    pub fn adjustments(&self) -> &[InventoryAdjustment] {
        &self.adjustments
    }

    /// Returns the ids of every purchased product.
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.items.iter().map(|i| i.product_id.clone()).collect()
    }

}

/// Normalizes raw request lines.
///
/// Rejects an empty cart and zero quantities, and merges repeated product ids
/// into one line (keeping first-seen order) so each product is looked up and
/// decremented once. A merged line above `MAX_LINE_QUANTITY` is rejected.
pub fn merge_requests(
    requests: &[LineItemRequest],
) -> Result<Vec<LineItemRequest>, RejectionReason> {
    if requests.is_empty() {
        return Err(RejectionReason::EmptyCart);
    }

    let mut merged: Vec<LineItemRequest> = Vec::with_capacity(requests.len());
    let mut positions: HashMap<&ProductId, usize> = HashMap::new();

    for request in requests {
        if request.quantity == 0 {
            return Err(RejectionReason::InvalidQuantity {
                product_id: request.product_id.clone(),
            });
        }
        match positions.get(&request.product_id) {
            Some(&idx) => {
                merged[idx].quantity = merged[idx].quantity.saturating_add(request.quantity);
            }
            None => {
                positions.insert(&request.product_id, merged.len());
                merged.push(request.clone());
            }
        }
    }

    if let Some(line) = merged.iter().find(|r| r.quantity > MAX_LINE_QUANTITY) {
        return Err(RejectionReason::InvalidQuantity {
            product_id: line.product_id.clone(),
        });
    }

    Ok(merged)
}

/// Validates requested line items against the current product snapshot.
///
/// Pure: performs no I/O. `products` is the result of one batch lookup of
/// the requested ids and may be missing entries or contain extras.
pub fn validate_cart(
    requests: &[LineItemRequest],
    products: &[Product],
) -> Result<ValidatedCart, RejectionReason> {
    let requests = merge_requests(requests)?;
    let by_id: HashMap<&ProductId, &Product> = products.iter().map(|p| (&p.id, p)).collect();

    let missing_ids: Vec<ProductId> = requests
        .iter()
        .filter(|r| !by_id.contains_key(&r.product_id))
        .map(|r| r.product_id.clone())
        .collect();
    if !missing_ids.is_empty() {
        return Err(RejectionReason::ProductsNotFound { missing_ids });
    }

    let mut items = Vec::with_capacity(requests.len());
    let mut adjustments = Vec::new();
    let mut subtotal = Money::zero();

    for request in &requests {
        let product = by_id[&request.product_id];

        if !product.is_active {
            return Err(RejectionReason::ProductInactive {
                product_id: product.id.clone(),
            });
        }

        if !product.can_supply(request.quantity) {
            return Err(RejectionReason::InsufficientInventory {
                product_id: product.id.clone(),
                available: product.available_quantity,
                requested: request.quantity,
            });
        }

        let line_total = product
            .unit_price
            .checked_multiply(request.quantity)
            .and_then(|total| subtotal.checked_add(total).map(|sum| (total, sum)))
            .filter(|(_, sum)| sum.cents() <= MAX_SUBTOTAL_CENTS);
        let Some((line_total, running)) = line_total else {
            return Err(RejectionReason::InvalidQuantity {
                product_id: product.id.clone(),
            });
        };
        subtotal = running;

        if product.tracks_quantity {
            adjustments.push(InventoryAdjustment {
                product_id: product.id.clone(),
                quantity: request.quantity,
                new_quantity: product.available_quantity - i64::from(request.quantity),
            });
        }

        items.push(ValidatedLineItem {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity: request.quantity,
            unit_price_at_purchase: product.unit_price,
            line_total,
        });
    }

    Ok(ValidatedCart { items, adjustments })
}
