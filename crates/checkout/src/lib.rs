//! Order placement as a saga over independently committed store writes.
//!
//! The placement follows these steps:
//! 1. Validate the cart against current stock
//! 2. Price it
//! 3. Write the order header, then its line items
//! 4. Decrement stock for tracked products
//! 5. Remove the purchased items from the cart
//! 6. Read the order back for the response
//!
//! A failed line item write deletes the header again. Steps 4 and 5 run after
//! the order is committed and never undo it; their failures are reported.

pub mod adjuster;
pub mod assembler;
pub mod cart;
pub mod coordinator;
pub mod error;
pub mod locks;
pub mod state;
pub mod tracker;
pub mod validator;
pub mod writer;

pub use adjuster::{AdjustmentFailure, AdjustmentReport, InventoryAdjuster};
pub use assembler::{OrderAssembler, OrderItemView, OrderView};
pub use cart::{CartReconciler, CartReconciliation};
pub use coordinator::{CheckoutCoordinator, PlaceOrder, PlacedOrder};
pub use error::{CheckoutError, Result};
pub use locks::{ProductGuard, ProductLocks};
pub use state::PlacementState;
pub use tracker::PlacementTracker;
pub use validator::InventoryValidator;
pub use writer::{OrderDetails, OrderWriter};
