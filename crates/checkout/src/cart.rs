//! Removal of purchased items from the customer's cart.

use common::{CustomerId, ProductId};
use order_store::CartStore;

/// Outcome of clearing purchased items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartReconciliation {
    /// The rows were removed; `removed` may be zero if they were already gone.
    Cleared { removed: u64 },
    /// The cart store failed; the order stands regardless.
    Failed { error: String },
}

impl CartReconciliation {
    pub fn is_cleared(&self) -> bool {
        matches!(self, CartReconciliation::Cleared { .. })
    }
}

/// Best-effort, idempotent cart cleanup.
#[derive(Debug, Clone)]
pub struct CartReconciler<S> {
    store: S,
}

impl<S: CartStore> CartReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, product_ids), fields(count = product_ids.len()))]
    pub async fn clear_purchased_items(
        &self,
        customer_id: CustomerId,
        product_ids: &[ProductId],
    ) -> CartReconciliation {
        match self.store.remove_cart_items(customer_id, product_ids).await {
            Ok(removed) => CartReconciliation::Cleared { removed },
            Err(error) => {
                metrics::counter!("checkout_cart_reconciliation_failures_total").increment(1);
                tracing::warn!(%customer_id, %error, "cart reconciliation failed");
                CartReconciliation::Failed {
                    error: error.to_string(),
                }
            }
        }
    }
}
