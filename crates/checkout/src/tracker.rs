//! Shared progress record for one placement.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::error::{CheckoutError, Result};
use crate::state::PlacementState;

#[derive(Debug, Default)]
struct TrackerState {
    current: PlacementState,
    trail: Vec<PlacementState>,
    abandoned: bool,
}

/// Tracks the state of a placement that may outlive its caller.
///
/// The running placement advances it and reports how the order write ended;
/// a caller whose deadline elapsed uses it to learn, atomically with respect
/// to the placement, whether an order exists.
#[derive(Debug, Clone)]
pub struct PlacementTracker {
    inner: Arc<Mutex<TrackerState>>,
    /// `None` until the write settles, then whether the order was committed.
    write_outcome: Arc<watch::Sender<Option<bool>>>,
}

impl PlacementTracker {
    /// Creates a tracker in `Validating`.
    pub fn new() -> Self {
        let (write_outcome, _) = watch::channel(None);
        Self {
            inner: Arc::new(Mutex::new(TrackerState {
                current: PlacementState::Validating,
                trail: vec![PlacementState::Validating],
                abandoned: false,
            })),
            write_outcome: Arc::new(write_outcome),
        }
    }

    /// Moves the placement to `next`.
    ///
    /// Fails with `Abandoned` when entering `Writing` after the caller gave up.
    pub async fn advance(&self, next: PlacementState) -> Result<()> {
        let mut inner = self.inner.lock().await;

        if inner.abandoned && next == PlacementState::Writing {
            return Err(CheckoutError::Abandoned);
        }
        if !inner.current.can_advance_to(next) {
            return Err(CheckoutError::InvalidTransition {
                from: inner.current,
                to: next,
            });
        }

        tracing::debug!(from = %inner.current, to = %next, "placement state changed");
        inner.current = next;
        inner.trail.push(next);
        Ok(())
    }

    /// Records how the order write ended.
    ///
    /// `committed` is true only when the header and every line item were stored.
    pub fn record_write(&self, committed: bool) {
        self.write_outcome.send_replace(Some(committed));
    }

    /// Settles the placement for a caller whose deadline elapsed.
    ///
    /// Before writing begins the placement is abandoned and false is returned.
    /// Once writing has begun this waits for the write to finish, which the
    /// store bounds, and returns whether the order was committed.
    pub async fn abandon_or_await_write(&self) -> bool {
        let mut outcome = {
            let mut inner = self.inner.lock().await;
            if !inner.trail.iter().any(PlacementState::is_past_commit_point) {
                inner.abandoned = true;
                return false;
            }
            self.write_outcome.subscribe()
        };

        match outcome.wait_for(Option::is_some).await {
            Ok(settled) => *settled == Some(true),
            Err(_) => false,
        }
    }

    /// Returns the current state.
    pub async fn state(&self) -> PlacementState {
        self.inner.lock().await.current
    }

    /// Returns every state visited so far, in order.
    pub async fn trail(&self) -> Vec<PlacementState> {
        self.inner.lock().await.trail.clone()
    }
}

impl Default for PlacementTracker {
    fn default() -> Self {
        Self::new()
    }
}
