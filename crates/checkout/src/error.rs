//! Checkout error types.

use common::OrderId;
use domain::{OrderNumber, RejectionReason};
use order_store::StoreError;
use thiserror::Error;

use crate::state::PlacementState;

/// Errors that can end an order placement.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart was refused before anything was written.
    #[error("Order rejected: {0}")]
    Rejected(#[from] RejectionReason),

    /// A store call failed and nothing was left behind.
    #[error("Persistence error: {0}")]
    Persistence(#[source] StoreError),

    /// The line item write failed and the header could not be deleted.
    ///
    /// An orphan header now exists and needs manual reconciliation.
    #[error(
        "Compensation failed for order {order_id}: write error: {write_error}; delete error: {compensation_error}"
    )]
    CompensationFailed {
        order_id: OrderId,
        write_error: StoreError,
        compensation_error: StoreError,
    },

    /// The order was committed but could not be read back.
    #[error("Order {order_number} was created but could not be assembled: {source}")]
    AssemblyFailed {
        order_id: OrderId,
        order_number: OrderNumber,
        #[source]
        source: Box<CheckoutError>,
    },

    /// The assembler found no order with this id.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The caller's deadline elapsed.
    ///
    /// `committed` is true only when the order and its items were written;
    /// the placement then keeps running in the background.
    #[error("Order placement deadline exceeded (committed: {committed})")]
    DeadlineExceeded { committed: bool },

    /// The placement was abandoned before writing because its caller gave up.
    #[error("Order placement abandoned before writing")]
    Abandoned,

    /// The placement state machine was driven out of order.
    #[error("Invalid placement transition from {from} to {to}")]
    InvalidTransition {
        from: PlacementState,
        to: PlacementState,
    },

    /// The placement task itself failed.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheckoutError {
    /// Returns true if the order exists even though the placement reported an error.
    pub fn is_committed(&self) -> bool {
        matches!(
            self,
            CheckoutError::AssemblyFailed { .. } | CheckoutError::DeadlineExceeded { committed: true }
        )
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckoutError::Rejected(reason) => reason.code(),
            CheckoutError::Persistence(_) => "persistence",
            CheckoutError::CompensationFailed { .. } => "compensation_failed",
            CheckoutError::AssemblyFailed { .. } => "assembly_failed",
            CheckoutError::NotFound(_) => "not_found",
            CheckoutError::DeadlineExceeded { .. } => "deadline_exceeded",
            CheckoutError::Abandoned => "abandoned",
            CheckoutError::InvalidTransition { .. } => "invalid_transition",
            CheckoutError::Internal(_) => "internal",
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
