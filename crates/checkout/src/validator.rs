//! Cart validation against the product store.

use common::{AddressId, CustomerId};
use domain::{LineItemRequest, RejectionReason, ValidatedCart, merge_requests, validate_cart};
use order_store::{AddressStore, ProductStore};

use crate::error::{CheckoutError, Result};

/// Checks requested line items against current catalog state.
///
/// Reads only. Callers that need the result to stay true until the stock is
/// decremented must hold the products' locks across validation and adjustment.
#[derive(Debug, Clone)]
pub struct InventoryValidator<S> {
    store: S,
}

impl<S: ProductStore> InventoryValidator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validates `requests` with one batch product lookup.
    ///
    /// An empty cart or zero quantity is refused before the store is touched.
    #[tracing::instrument(skip(self, requests), fields(lines = requests.len()))]
    pub async fn validate(&self, requests: &[LineItemRequest]) -> Result<ValidatedCart> {
        let requests = merge_requests(requests)?;
        let ids: Vec<_> = requests.iter().map(|r| r.product_id.clone()).collect();

        let products = self
            .store
            .get_products(&ids)
            .await
            .map_err(CheckoutError::Persistence)?;

        let cart = validate_cart(&requests, &products)?;
        tracing::debug!(
            items = cart.items().len(),
            adjustments = cart.adjustments().len(),
            "cart validated"
        );
        Ok(cart)
    }
}

impl<S: AddressStore> InventoryValidator<S> {
    /// Checks that every address id belongs to `customer_id`.
    ///
    /// Unknown ids and other customers' ids are refused alike.
    #[tracing::instrument(skip(self, address_ids), fields(addresses = address_ids.len()))]
    pub async fn validate_addresses(
        &self,
        customer_id: CustomerId,
        address_ids: &[AddressId],
    ) -> Result<()> {
        for &address_id in address_ids {
            let address = self
                .store
                .get_address(address_id)
                .await
                .map_err(CheckoutError::Persistence)?;

            match address {
                Some(address) if address.customer_id == customer_id => {}
                Some(_) => {
                    tracing::warn!(%address_id, "address belongs to another customer");
                    return Err(RejectionReason::InvalidAddress { address_id }.into());
                }
                None => return Err(RejectionReason::InvalidAddress { address_id }.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::ProductId;
    use domain::{Address, Money, Product};
    use order_store::{InMemoryStore, StoreOp};

    use super::*;

    async fn store_with(products: Vec<Product>) -> InMemoryStore {
        let store = InMemoryStore::new();
        for product in products {
            store.insert_product(product).await;
        }
        store
    }

    #[tokio::test]
    async fn test_validates_against_current_price() {
        let store = store_with(vec![
            Product::new("P1", "Widget", Money::from_cents(1000)).with_stock(5),
        ])
        .await;
        let validator = InventoryValidator::new(store);

        let cart = validator
            .validate(&[LineItemRequest::new("P1", 2)])
            .await
            .unwrap();
        assert_eq!(cart.items()[0].unit_price_at_purchase, Money::from_cents(1000));
        assert_eq!(cart.items()[0].line_total, Money::from_cents(2000));
        assert_eq!(cart.adjustments()[0].new_quantity, 3);
    }

    #[tokio::test]
    async fn test_empty_cart_skips_lookup() {
        let store = InMemoryStore::new();
        store.fail_on(StoreOp::ProductLookup, true).await;
        let validator = InventoryValidator::new(store);

        let err = validator.validate(&[]).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Rejected(RejectionReason::EmptyCart)));
    }

    #[tokio::test]
    async fn test_missing_products_identified() {
        let store = store_with(vec![
            Product::new("P1", "Widget", Money::from_cents(1000)).with_stock(5),
        ])
        .await;
        let validator = InventoryValidator::new(store);

        let err = validator
            .validate(&[LineItemRequest::new("P1", 1), LineItemRequest::new("GHOST", 1)])
            .await
            .unwrap_err();
        match err {
            CheckoutError::Rejected(RejectionReason::ProductsNotFound { missing_ids }) => {
                assert_eq!(missing_ids, vec![ProductId::new("GHOST")]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_lookup_failure_is_persistence_error() {
        let store = InMemoryStore::new();
        store.fail_on(StoreOp::ProductLookup, true).await;
        let validator = InventoryValidator::new(store);

        let err = validator
            .validate(&[LineItemRequest::new("P1", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Persistence(_)));
    }

    fn address(customer_id: CustomerId) -> Address {
        Address {
            id: AddressId::new(),
            customer_id,
            full_name: "Ada Buyer".to_string(),
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            region: None,
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        }
    }

    #[tokio::test]
    async fn test_own_addresses_accepted() {
        let store = InMemoryStore::new();
        let customer = CustomerId::new();
        let home = address(customer);
        store.insert_address(home.clone()).await;
        let validator = InventoryValidator::new(store);

        validator
            .validate_addresses(customer, &[home.id, home.id])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_foreign_and_unknown_addresses_refused() {
        let store = InMemoryStore::new();
        let customer = CustomerId::new();
        let other = address(CustomerId::new());
        store.insert_address(other.clone()).await;
        let validator = InventoryValidator::new(store);

        let err = validator
            .validate_addresses(customer, &[other.id])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Rejected(RejectionReason::InvalidAddress { address_id }) if address_id == other.id
        ));

        let unknown = AddressId::new();
        let err = validator
            .validate_addresses(customer, &[unknown])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Rejected(RejectionReason::InvalidAddress { address_id }) if address_id == unknown
        ));
    }

    #[tokio::test]
    async fn test_address_lookup_failure_is_persistence_error() {
        let store = InMemoryStore::new();
        store.fail_on(StoreOp::AddressRead, true).await;
        let validator = InventoryValidator::new(store);

        let err = validator
            .validate_addresses(CustomerId::new(), &[AddressId::new()])
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Persistence(_)));
    }
}
