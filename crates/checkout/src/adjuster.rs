//! Best-effort stock decrements after an order is committed.

use common::ProductId;
use domain::InventoryAdjustment;
use futures_util::future::join_all;
use order_store::{ProductStore, StoreError};

/// A stock decrement that could not be applied.
#[derive(Debug)]
pub struct AdjustmentFailure {
    pub product_id: ProductId,
    pub error: StoreError,
}

/// Outcome of applying every adjustment of one order.
#[derive(Debug, Default)]
pub struct AdjustmentReport {
    pub applied: Vec<ProductId>,
    pub failed: Vec<AdjustmentFailure>,
}

impl AdjustmentReport {
    /// Returns true if every adjustment was applied.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns the ids of products whose stock was not decremented.
    pub fn failed_ids(&self) -> Vec<ProductId> {
        self.failed.iter().map(|f| f.product_id.clone()).collect()
    }
}

/// Applies stock decrements for quantity-tracked products.
///
/// Each decrement is attempted independently and concurrently; failures are
/// collected into the report rather than returned as an error, because the
/// order they belong to is already committed.
#[derive(Debug, Clone)]
pub struct InventoryAdjuster<S> {
    store: S,
}

impl<S: ProductStore> InventoryAdjuster<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, adjustments), fields(count = adjustments.len()))]
    pub async fn apply(&self, adjustments: &[InventoryAdjustment]) -> AdjustmentReport {
        let results = join_all(adjustments.iter().map(|adjustment| async move {
            let result = self
                .store
                .decrement_stock(&adjustment.product_id, adjustment.quantity)
                .await;
            (adjustment, result)
        }))
        .await;

        let mut report = AdjustmentReport::default();
        for (adjustment, result) in results {
            match result {
                Ok(new_quantity) => {
                    if new_quantity != adjustment.new_quantity {
                        // Someone outside this process changed the stock in between.
                        tracing::debug!(
                            product_id = %adjustment.product_id,
                            expected = adjustment.new_quantity,
                            actual = new_quantity,
                            "stock drifted since validation"
                        );
                    }
                    report.applied.push(adjustment.product_id.clone());
                }
                Err(error) => {
                    metrics::counter!("checkout_inventory_adjustment_failures_total")
                        .increment(1);
                    tracing::warn!(
                        product_id = %adjustment.product_id,
                        quantity = adjustment.quantity,
                        %error,
                        "inventory adjustment failed"
                    );
                    report.failed.push(AdjustmentFailure {
                        product_id: adjustment.product_id.clone(),
                        error,
                    });
                }
            }
        }
        report
    }
}
