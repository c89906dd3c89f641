//! Read-back of a committed order for the response payload.

use std::collections::HashMap;

use common::{AddressId, OrderId, ProductId};
use domain::{Address, Order, OrderLineItem};
use order_store::{AddressStore, OrderStore, ProductStore};

use crate::error::{CheckoutError, Result};

/// A line item joined with its product's display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemView {
    pub item: OrderLineItem,
    /// `None` if the product has since disappeared from the catalog.
    pub product_name: Option<String>,
}

/// An order header with its items and addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderView {
    pub order: Order,
    pub items: Vec<OrderItemView>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
}

/// Joins an order with its line items, products and addresses.
#[derive(Debug, Clone)]
pub struct OrderAssembler<S> {
    store: S,
}

impl<S> OrderAssembler<S>
where
    S: OrderStore + ProductStore + AddressStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn assemble(&self, order_id: OrderId) -> Result<OrderView> {
        let order = self
            .store
            .get_order(order_id)
            .await
            .map_err(CheckoutError::Persistence)?
            .ok_or(CheckoutError::NotFound(order_id))?;

        let line_items = self
            .store
            .get_line_items(order_id)
            .await
            .map_err(CheckoutError::Persistence)?;

        let product_ids: Vec<ProductId> = line_items.iter().map(|i| i.product_id.clone()).collect();
        let (products, shipping_address, billing_address) = tokio::try_join!(
            self.store.get_products(&product_ids),
            self.address(order.shipping_address_id),
            self.address(order.billing_address_id),
        )
        .map_err(CheckoutError::Persistence)?;

        let names: HashMap<ProductId, String> =
            products.into_iter().map(|p| (p.id, p.name)).collect();

        let items = line_items
            .into_iter()
            .map(|item| OrderItemView {
                product_name: names.get(&item.product_id).cloned(),
                item,
            })
            .collect();

        Ok(OrderView {
            order,
            items,
            shipping_address,
            billing_address,
        })
    }

    async fn address(
        &self,
        address_id: Option<AddressId>,
    ) -> order_store::Result<Option<Address>> {
        match address_id {
            Some(id) => self.store.get_address(id).await,
            None => Ok(None),
        }
    }
}
