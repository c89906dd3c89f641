use async_trait::async_trait;
use common::{AddressId, CustomerId, OrderId, ProductId};
use domain::{Address, Order, OrderLineItem, Product};

use crate::Result;

/// Catalog access needed by checkout.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Fetches every product whose id is in `ids` in one round trip.
    ///
    /// Unknown ids are simply absent from the result.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Decrements stock only if at least `quantity` units remain.
    ///
    /// Returns the new available quantity. Fails with
    /// `StoreError::StockConflict` instead of going negative.
    async fn decrement_stock(&self, product_id: &ProductId, quantity: u32) -> Result<i64>;
}

/// Order header and line item persistence.
///
/// Headers and items live in separate tables; each call commits on its own.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts an order header.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Inserts all line items of one order as a single batch.
    async fn insert_line_items(&self, items: &[OrderLineItem]) -> Result<()>;

    /// Deletes an order header and any items attached to it.
    ///
    /// Returns false if there was nothing to delete.
    async fn delete_order(&self, order_id: OrderId) -> Result<bool>;

    /// Reads an order header.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Reads the line items of an order.
    async fn get_line_items(&self, order_id: OrderId) -> Result<Vec<OrderLineItem>>;
}

/// Persisted shopping carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Removes the given products from a customer's cart.
    ///
    /// Returns the number of cart rows removed; removing absent rows is not
    /// an error.
    async fn remove_cart_items(
        &self,
        customer_id: CustomerId,
        product_ids: &[ProductId],
    ) -> Result<u64>;
}

/// Saved customer addresses.
#[async_trait]
pub trait AddressStore: Send + Sync {
    async fn get_address(&self, address_id: AddressId) -> Result<Option<Address>>;
}

/// Everything order placement needs from its backend.
pub trait CheckoutStore: ProductStore + OrderStore + CartStore + AddressStore {}

impl<T> CheckoutStore for T where T: ProductStore + OrderStore + CartStore + AddressStore {}
