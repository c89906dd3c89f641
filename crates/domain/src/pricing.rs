//! Authoritative order pricing.

use serde::{Deserialize, Serialize};

use crate::cart::ValidatedLineItem;
use crate::money::Money;

/// Tax and shipping rules applied at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Tax rate in basis points (800 = 8%).
    pub tax_rate_bps: u32,
    /// Subtotals at or above this amount ship for free.
    pub free_shipping_threshold: Money,
    /// Flat shipping charge below the threshold.
    pub shipping_cost: Money,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate_bps: 800,
            free_shipping_threshold: Money::from_cents(5000),
            shipping_cost: Money::from_cents(999),
        }
    }
}

/// Priced totals for a validated cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub total_amount: Money,
}

impl PricingPolicy {
    /// Prices validated line items.
    ///
    /// Currency rounding happens once, when the total is formed; the tax
    /// amount is whatever remains of the total after subtotal and shipping,
    /// so `total == subtotal + tax + shipping` always holds exactly.
    pub fn price(&self, items: &[ValidatedLineItem]) -> PricingResult {
        let subtotal: Money = items.iter().map(|item| item.line_total).sum();

        let shipping_amount = if subtotal >= self.free_shipping_threshold {
            Money::zero()
        } else {
            self.shipping_cost
        };

        let total_amount = subtotal + shipping_amount + subtotal.apply_rate_bps(self.tax_rate_bps);
        let tax_amount = total_amount - subtotal - shipping_amount;

        PricingResult {
            subtotal,
            tax_amount,
            shipping_amount,
            total_amount,
        }
    }
}
