//! Order placement state machine.

use serde::{Deserialize, Serialize};

/// The state of one order placement.
///
/// State transitions:
/// ```text
/// Validating ──► Pricing ──► Writing ──► AdjustingInventory ──► ReconcilingCart ──► Assembling ──► Done
///     │                         │                                                      │
///     └──► Rejected             └──► Failed ◄────────────────────────────────────────────┘
/// ```
///
/// Inventory adjustment and cart reconciliation never lead to `Failed`: once
/// `Writing` succeeds the order is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PlacementState {
    /// The cart is being checked against current stock.
    #[default]
    Validating,

    /// Totals are being computed.
    Pricing,

    /// The order header and line items are being written.
    Writing,

    /// Stock decrements are being applied (best effort).
    AdjustingInventory,

    /// Purchased items are being removed from the cart (best effort).
    ReconcilingCart,

    /// The committed order is being read back.
    Assembling,

    /// The order was placed and assembled (terminal state).
    Done,

    /// The cart was refused before any write (terminal state).
    Rejected,

    /// Writing or assembling failed (terminal state).
    Failed,
}

impl PlacementState {
    /// Returns true if `next` is a legal successor of this state.
    pub fn can_advance_to(&self, next: PlacementState) -> bool {
        use PlacementState::*;
        matches!(
            (self, next),
            (Validating, Pricing)
                | (Validating, Rejected)
                | (Pricing, Writing)
                | (Writing, AdjustingInventory)
                | (Writing, Failed)
                | (AdjustingInventory, ReconcilingCart)
                | (ReconcilingCart, Assembling)
                | (Assembling, Done)
                | (Assembling, Failed)
        )
    }

    /// Returns true once the order write has begun.
    ///
    /// `Failed` is excluded because it is also reached when the write fails.
    pub fn is_past_commit_point(&self) -> bool {
        matches!(
            self,
            PlacementState::Writing
                | PlacementState::AdjustingInventory
                | PlacementState::ReconcilingCart
                | PlacementState::Assembling
                | PlacementState::Done
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementState::Validating => "Validating",
            PlacementState::Pricing => "Pricing",
            PlacementState::Writing => "Writing",
            PlacementState::AdjustingInventory => "AdjustingInventory",
            PlacementState::ReconcilingCart => "ReconcilingCart",
            PlacementState::Assembling => "Assembling",
            PlacementState::Done => "Done",
            PlacementState::Rejected => "Rejected",
            PlacementState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for PlacementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
