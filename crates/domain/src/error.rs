//! Cart rejection reasons.

use common::{AddressId, ProductId};
use thiserror::Error;

/// Why a checkout request was rejected before anything was written.
///
/// Every variant is recoverable by the caller resubmitting a corrected cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    /// The request contained no line items.
    #[error("Cart is empty")]
    EmptyCart,

    /// A line item asked for zero units, more than one line may hold, or an
    /// amount too large to price.
    #[error("Invalid quantity for product {product_id}: must be between 1 and {}", crate::cart::MAX_LINE_QUANTITY)]
    InvalidQuantity { product_id: ProductId },

    /// One or more requested products do not exist.
    #[error("Products not found: {}", join_ids(.missing_ids))]
    ProductsNotFound { missing_ids: Vec<ProductId> },

    /// A requested product is not for sale.
    #[error("Product {product_id} is not available for sale")]
    ProductInactive { product_id: ProductId },

    /// A tracked product does not have enough stock.
    #[error(
        "Insufficient inventory for product {product_id}: {available} available, {requested} requested"
    )]
    InsufficientInventory {
        product_id: ProductId,
        available: i64,
        requested: u32,
    },

    /// A shipping or billing address is unknown or saved by another customer.
    ///
    /// Both cases share one message so address ids cannot be enumerated.
    #[error("Address {address_id} is not one of your saved addresses")]
    InvalidAddress { address_id: AddressId },
}

impl RejectionReason {
    /// Returns a stable machine-readable code for this rejection.
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::EmptyCart => "EMPTY_CART",
            RejectionReason::InvalidQuantity { .. } => "INVALID_QUANTITY",
            RejectionReason::ProductsNotFound { .. } => "PRODUCTS_NOT_FOUND",
            RejectionReason::ProductInactive { .. } => "PRODUCT_INACTIVE",
            RejectionReason::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            RejectionReason::InvalidAddress { .. } => "INVALID_ADDRESS",
        }
    }
}

fn join_ids(ids: &[ProductId]) -> String {
    ids.iter()
        .map(ProductId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
