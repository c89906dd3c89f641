//! Domain layer for the checkout system.
//!
//! This crate holds the pure parts of order placement:
//! - Money arithmetic in integer cents
//! - Product and address read projections
//! - Cart validation against a stock snapshot
//! - Pricing (subtotal, tax, shipping, total)
//! - The order header and line item model

pub mod address;
pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod pricing;
pub mod product;

pub use address::Address;
pub use cart::{
    InventoryAdjustment, LineItemRequest, MAX_LINE_QUANTITY, ValidatedCart, ValidatedLineItem,
    merge_requests, validate_cart,
};
pub use common::{AddressId, CustomerId, LineItemId, OrderId, ProductId};
pub use error::RejectionReason;
pub use money::Money;
pub use order::{
    Order, OrderLineItem, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus,
};
pub use pricing::{PricingPolicy, PricingResult};
pub use product::Product;
