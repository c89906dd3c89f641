//! Order header and line item model.

mod number;
mod status;

pub use number::OrderNumber;
pub use status::{OrderStatus, PaymentStatus};

use chrono::{DateTime, Utc};
use common::{AddressId, CustomerId, LineItemId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::cart::ValidatedLineItem;
use crate::money::Money;
use crate::pricing::PricingResult;

/// How the customer intends to pay. Recorded only; settlement happens elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Paypal,
    BankTransfer,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }

    /// Parses the stored snake_case name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "card" => Some(PaymentMethod::Card),
            "paypal" => Some(PaymentMethod::Paypal),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            "cash_on_delivery" => Some(PaymentMethod::CashOnDelivery),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub total_amount: Money,
    pub shipping_address_id: Option<AddressId>,
    pub billing_address_id: Option<AddressId>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Builds a new pending order header from priced totals.
    pub fn pending(
        order_number: OrderNumber,
        customer_id: CustomerId,
        pricing: &PricingResult,
    ) -> Self {
        Self {
            id: OrderId::new(),
            order_number,
            customer_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            subtotal: pricing.subtotal,
            tax_amount: pricing.tax_amount,
            shipping_amount: pricing.shipping_amount,
            total_amount: pricing.total_amount,
            shipping_address_id: None,
            billing_address_id: None,
            payment_method: None,
            notes: None,
            created_at: Utc::now(),
        }
    }
}

/// A persisted line item, owned by exactly one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: LineItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

impl OrderLineItem {
    /// Creates a line item for `order_id` from a validated item.
    pub fn from_validated(order_id: OrderId, item: &ValidatedLineItem) -> Self {
        Self {
            id: LineItemId::new(),
            order_id,
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price_at_purchase,
            line_total: item.line_total,
        }
    }
}
