//! Order persistence with compensation.

use common::{AddressId, CustomerId};
use domain::{
    Order, OrderLineItem, OrderNumber, PaymentMethod, PricingResult, RejectionReason,
    ValidatedLineItem,
};
use order_store::{OrderStore, StoreError};

use crate::error::{CheckoutError, Result};

/// How many times a colliding order number is regenerated.
const ORDER_NUMBER_RETRIES: usize = 3;

/// Optional order fields supplied by the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDetails {
    pub shipping_address_id: Option<AddressId>,
    pub billing_address_id: Option<AddressId>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

impl OrderDetails {
    /// Returns the shipping and billing address ids that were supplied.
    pub fn address_ids(&self) -> Vec<AddressId> {
        self.shipping_address_id
            .into_iter()
            .chain(self.billing_address_id)
            .collect()
    }
}

/// Writes an order header and its line items as two separate store calls.
///
/// If the line items cannot be written the header is deleted again, so a
/// header without items is never left behind unless that delete also fails.
#[derive(Debug, Clone)]
pub struct OrderWriter<S> {
    store: S,
}

impl<S: OrderStore> OrderWriter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persists a pending order for `items`.
    ///
    /// Returns the header as written. Fails with `Persistence` when nothing
    /// survived, or `CompensationFailed` when an orphan header remains.
    #[tracing::instrument(skip(self, items, pricing, details), fields(total = %pricing.total_amount))]
    pub async fn create_order(
        &self,
        customer_id: CustomerId,
        items: &[ValidatedLineItem],
        pricing: &PricingResult,
        details: &OrderDetails,
    ) -> Result<Order> {
        if items.is_empty() {
            return Err(RejectionReason::EmptyCart.into());
        }

        let order = self
            .insert_header(customer_id, pricing, details)
            .await
            .map_err(CheckoutError::Persistence)?;

        let line_items: Vec<OrderLineItem> = items
            .iter()
            .map(|item| OrderLineItem::from_validated(order.id, item))
            .collect();

        if let Err(write_error) = self.store.insert_line_items(&line_items).await {
            return Err(self.compensate(&order, write_error).await);
        }

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            items = line_items.len(),
            "order written"
        );
        Ok(order)
    }

    async fn insert_header(
        &self,
        customer_id: CustomerId,
        pricing: &PricingResult,
        details: &OrderDetails,
    ) -> std::result::Result<Order, StoreError> {
        let mut retries = 0;
        loop {
            let mut order = Order::pending(OrderNumber::generate(), customer_id, pricing);
            order.shipping_address_id = details.shipping_address_id;
            order.billing_address_id = details.billing_address_id;
            order.payment_method = details.payment_method;
            order.notes = details.notes.clone();

            match self.store.insert_order(&order).await {
                Ok(()) => return Ok(order),
                Err(StoreError::DuplicateOrderNumber(number)) if retries < ORDER_NUMBER_RETRIES => {
                    retries += 1;
                    tracing::warn!(%number, retries, "order number collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Deletes the header after a failed line item write.
    async fn compensate(&self, order: &Order, write_error: StoreError) -> CheckoutError {
        metrics::counter!("checkout_compensations_total").increment(1);
        tracing::warn!(
            order_id = %order.id,
            error = %write_error,
            "line item write failed, deleting order header"
        );

        match self.store.delete_order(order.id).await {
            Ok(_) => CheckoutError::Persistence(write_error),
            Err(compensation_error) => {
                metrics::counter!("checkout_compensation_failures_total").increment(1);
                tracing::error!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    write_error = %write_error,
                    compensation_error = %compensation_error,
                    "orphan order header left behind, manual reconciliation required"
                );
                CheckoutError::CompensationFailed {
                    order_id: order.id,
                    write_error,
                    compensation_error,
                }
            }
        }
    }
}
