//! Per-product mutual exclusion.

use std::collections::HashMap;
use std::sync::Arc;

use common::ProductId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Unused entries are pruned once the table grows past this size.
const PRUNE_THRESHOLD: usize = 1024;

/// Exclusive access to a set of products, released on drop.
#[derive(Debug)]
pub struct ProductGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

/// A table of per-product async mutexes.
///
/// Placements hold the guard for their products from the stock lookup until
/// the stock decrements are applied, so two placements touching the same
/// product run that section one after the other. Locks are always taken in
/// sorted id order, which rules out deadlock between overlapping carts.
#[derive(Debug, Clone, Default)]
pub struct ProductLocks {
    table: Arc<Mutex<HashMap<ProductId, Arc<Mutex<()>>>>>,
}

impl ProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until every product in `product_ids` is exclusively held.
    pub async fn acquire(&self, product_ids: &[ProductId]) -> ProductGuard {
        let mut ids = product_ids.to_vec();
        ids.sort();
        ids.dedup();

        let mutexes: Vec<Arc<Mutex<()>>> = {
            let mut table = self.table.lock().await;
            if table.len() > PRUNE_THRESHOLD {
                // Entries only referenced by the table are neither held nor awaited.
                table.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            }
            ids.iter()
                .map(|id| Arc::clone(table.entry(id.clone()).or_default()))
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }

        ProductGuard { _guards: guards }
    }
}
