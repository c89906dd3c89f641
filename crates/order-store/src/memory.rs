use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{AddressId, CustomerId, OrderId, ProductId};
use domain::{Address, Order, OrderLineItem, Product};
use tokio::sync::RwLock;

use crate::store::{AddressStore, CartStore, OrderStore, ProductStore};
use crate::{Result, StoreError};

/// Store operations that can be made to fail or stall in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ProductLookup,
    StockUpdate,
    OrderInsert,
    LineItemInsert,
    OrderDelete,
    OrderRead,
    CartRemove,
    AddressRead,
}

impl StoreOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOp::ProductLookup => "product_lookup",
            StoreOp::StockUpdate => "stock_update",
            StoreOp::OrderInsert => "order_insert",
            StoreOp::LineItemInsert => "line_item_insert",
            StoreOp::OrderDelete => "order_delete",
            StoreOp::OrderRead => "order_read",
            StoreOp::CartRemove => "cart_remove",
            StoreOp::AddressRead => "address_read",
        }
    }
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    line_items: Vec<OrderLineItem>,
    carts: HashMap<CustomerId, BTreeMap<ProductId, u32>>,
    addresses: HashMap<AddressId, Address>,
    failing_ops: HashSet<StoreOp>,
    failing_stock_products: HashSet<ProductId>,
    latency: HashMap<StoreOp, Duration>,
    forced_number_collisions: usize,
}

/// In-memory backend for tests and local development.
///
/// Behaves like the PostgreSQL backend, including the conditional stock
/// decrement, and adds hooks for injecting failures and latency.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // -- Seeding --

    /// Inserts or replaces a catalog product.
    pub async fn insert_product(&self, product: Product) {
        self.state
            .write()
            .await
            .products
            .insert(product.id.clone(), product);
    }

    /// Inserts or replaces a customer address.
    pub async fn insert_address(&self, address: Address) {
        self.state
            .write()
            .await
            .addresses
            .insert(address.id, address);
    }

    /// Adds units of a product to a customer's cart.
    pub async fn add_to_cart(&self, customer_id: CustomerId, product_id: ProductId, quantity: u32) {
        let mut state = self.state.write().await;
        *state
            .carts
            .entry(customer_id)
            .or_default()
            .entry(product_id)
            .or_default() += quantity;
    }

    // -- Inspection --

    /// Returns the current state of a product.
    pub async fn product(&self, product_id: &ProductId) -> Option<Product> {
        self.state.read().await.products.get(product_id).cloned()
    }

    /// Returns the number of order headers stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the number of line items stored across all orders.
    pub async fn line_item_count(&self) -> usize {
        self.state.read().await.line_items.len()
    }

    /// Returns every order header belonging to a customer.
    pub async fn orders_for(&self, customer_id: CustomerId) -> Vec<Order> {
        self.state
            .read()
            .await
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect()
    }

    /// Returns a customer's cart as `(product, quantity)` pairs sorted by product.
    pub async fn cart_items(&self, customer_id: CustomerId) -> Vec<(ProductId, u32)> {
        self.state
            .read()
            .await
            .carts
            .get(&customer_id)
            .map(|cart| cart.iter().map(|(p, q)| (p.clone(), *q)).collect())
            .unwrap_or_default()
    }

    // -- Fault injection --

    /// Makes every call of `op` fail (or succeed again when `fail` is false).
    pub async fn fail_on(&self, op: StoreOp, fail: bool) {
        let mut state = self.state.write().await;
        if fail {
            state.failing_ops.insert(op);
        } else {
            state.failing_ops.remove(&op);
        }
    }

    /// Makes stock updates fail for one product only.
    pub async fn fail_stock_update_for(&self, product_id: ProductId) {
        self.state
            .write()
            .await
            .failing_stock_products
            .insert(product_id);
    }

    /// Delays every call of `op` by `delay` before it takes effect.
    pub async fn set_latency(&self, op: StoreOp, delay: Duration) {
        self.state.write().await.latency.insert(op, delay);
    }

    /// Makes the next `count` order inserts fail as order-number collisions.
    pub async fn force_order_number_collisions(&self, count: usize) {
        self.state.write().await.forced_number_collisions = count;
    }

    /// Applies configured latency, then any configured failure, for `op`.
    async fn enter(&self, op: StoreOp) -> Result<()> {
        let (delay, fail) = {
            let state = self.state.read().await;
            (
                state.latency.get(&op).copied(),
                state.failing_ops.contains(&op),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(StoreError::Unavailable(format!("{op} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        self.enter(StoreOp::ProductLookup).await?;

        let state = self.state.read().await;
        let unique: HashSet<&ProductId> = ids.iter().collect();
        Ok(unique
            .into_iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn decrement_stock(&self, product_id: &ProductId, quantity: u32) -> Result<i64> {
        self.enter(StoreOp::StockUpdate).await?;

        let mut state = self.state.write().await;
        if state.failing_stock_products.contains(product_id) {
            return Err(StoreError::Unavailable(format!(
                "stock update for {product_id} failed"
            )));
        }

        let product = state
            .products
            .get_mut(product_id)
            .ok_or_else(|| StoreError::NotFound(format!("product {product_id}")))?;

        let requested = i64::from(quantity);
        if product.available_quantity < requested {
            return Err(StoreError::StockConflict {
                product_id: product_id.clone(),
                requested: quantity,
                available: product.available_quantity,
            });
        }

        product.available_quantity -= requested;
        Ok(product.available_quantity)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        self.enter(StoreOp::OrderInsert).await?;

        let mut state = self.state.write().await;
        if state.forced_number_collisions > 0 {
            state.forced_number_collisions -= 1;
            return Err(StoreError::DuplicateOrderNumber(
                order.order_number.to_string(),
            ));
        }
        if state
            .orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(StoreError::DuplicateOrderNumber(
                order.order_number.to_string(),
            ));
        }

        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn insert_line_items(&self, items: &[OrderLineItem]) -> Result<()> {
        self.enter(StoreOp::LineItemInsert).await?;

        let mut state = self.state.write().await;
        // The whole batch is rejected if any item points at a missing order.
        if let Some(orphan) = items.iter().find(|i| !state.orders.contains_key(&i.order_id)) {
            return Err(StoreError::NotFound(format!("order {}", orphan.order_id)));
        }

        state.line_items.extend(items.iter().cloned());
        Ok(())
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<bool> {
        self.enter(StoreOp::OrderDelete).await?;

        let mut state = self.state.write().await;
        state.line_items.retain(|i| i.order_id != order_id);
        Ok(state.orders.remove(&order_id).is_some())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.enter(StoreOp::OrderRead).await?;
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn get_line_items(&self, order_id: OrderId) -> Result<Vec<OrderLineItem>> {
        self.enter(StoreOp::OrderRead).await?;
        Ok(self
            .state
            .read()
            .await
            .line_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn remove_cart_items(
        &self,
        customer_id: CustomerId,
        product_ids: &[ProductId],
    ) -> Result<u64> {
        self.enter(StoreOp::CartRemove).await?;

        let mut state = self.state.write().await;
        let Some(cart) = state.carts.get_mut(&customer_id) else {
            return Ok(0);
        };

        let removed = product_ids
            .iter()
            .filter(|id| cart.remove(*id).is_some())
            .count();
        Ok(removed as u64)
    }
}

#[async_trait]
impl AddressStore for InMemoryStore {
    async fn get_address(&self, address_id: AddressId) -> Result<Option<Address>> {
        self.enter(StoreOp::AddressRead).await?;
        Ok(self.state.read().await.addresses.get(&address_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use domain::{Money, OrderNumber, PricingResult};

    use super::*;

    fn pricing() -> PricingResult {
        PricingResult {
            subtotal: Money::from_cents(1000),
            tax_amount: Money::from_cents(80),
            shipping_amount: Money::from_cents(999),
            total_amount: Money::from_cents(2079),
        }
    }

    fn order() -> Order {
        Order::pending(OrderNumber::generate(), CustomerId::new(), &pricing())
    }

    fn line_item(order_id: OrderId) -> OrderLineItem {
        OrderLineItem {
            id: common::LineItemId::new(),
            order_id,
            product_id: ProductId::new("P1"),
            quantity: 1,
            unit_price: Money::from_cents(1000),
            line_total: Money::from_cents(1000),
        }
    }

    #[tokio::test]
    async fn test_batch_lookup_skips_unknown_ids() {
        let store = InMemoryStore::new();
        store
            .insert_product(Product::new("P1", "Widget", Money::from_cents(1000)).with_stock(5))
            .await;

        let found = store
            .get_products(&[ProductId::new("P1"), ProductId::new("P1"), ProductId::new("NOPE")])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "P1");
    }

    #[tokio::test]
    async fn test_decrement_stock_is_conditional() {
        let store = InMemoryStore::new();
        let id = ProductId::new("P1");
        store
            .insert_product(Product::new("P1", "Widget", Money::from_cents(1000)).with_stock(3))
            .await;

        assert_eq!(store.decrement_stock(&id, 2).await.unwrap(), 1);

        let err = store.decrement_stock(&id, 2).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::StockConflict {
                requested: 2,
                available: 1,
                ..
            }
        ));
        assert_eq!(store.product(&id).await.unwrap().available_quantity, 1);
    }

    #[tokio::test]
    async fn test_decrement_unknown_product() {
        let store = InMemoryStore::new();
        let err = store.decrement_stock(&"X".into(), 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_order_number_rejected() {
        let store = InMemoryStore::new();
        let first = order();
        let mut second = order();
        second.order_number = first.order_number.clone();

        store.insert_order(&first).await.unwrap();
        let err = store.insert_order(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateOrderNumber(_)));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_line_items_require_existing_order() {
        let store = InMemoryStore::new();
        let err = store
            .insert_line_items(&[line_item(OrderId::new())])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.line_item_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_order_cascades_to_items() {
        let store = InMemoryStore::new();
        let order = order();
        store.insert_order(&order).await.unwrap();
        store
            .insert_line_items(&[line_item(order.id), line_item(order.id)])
            .await
            .unwrap();
        assert_eq!(store.line_item_count().await, 2);

        assert!(store.delete_order(order.id).await.unwrap());
        assert!(!store.delete_order(order.id).await.unwrap());
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.line_item_count().await, 0);
    }

    #[tokio::test]
    async fn test_remove_cart_items_is_idempotent() {
        let store = InMemoryStore::new();
        let customer = CustomerId::new();
        store.add_to_cart(customer, ProductId::new("P1"), 2).await;
        store.add_to_cart(customer, ProductId::new("P2"), 1).await;

        let removed = store
            .remove_cart_items(customer, &[ProductId::new("P1")])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        let again = store
            .remove_cart_items(customer, &[ProductId::new("P1")])
            .await
            .unwrap();
        assert_eq!(again, 0);
        assert_eq!(store.cart_items(customer).await, vec![(ProductId::new("P2"), 1)]);
    }

    #[tokio::test]
    async fn test_injected_failure_and_recovery() {
        let store = InMemoryStore::new();
        store.fail_on(StoreOp::OrderRead, true).await;
        assert!(matches!(
            store.get_order(OrderId::new()).await,
            Err(StoreError::Unavailable(_))
        ));

        store.fail_on(StoreOp::OrderRead, false).await;
        assert!(store.get_order(OrderId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_forced_number_collisions_are_consumed() {
        let store = InMemoryStore::new();
        store.force_order_number_collisions(1).await;

        assert!(store.insert_order(&order()).await.is_err());
        assert!(store.insert_order(&order()).await.is_ok());
    }
}
