//! Demo catalog for running the server without a database.

use domain::{Money, Product};
use order_store::InMemoryStore;

/// Seeds a few products covering tracked, untracked and inactive stock.
pub async fn seed_catalog(store: &InMemoryStore) {
    let products = [
        Product::new("SKU-TSHIRT", "Logo T-Shirt", Money::from_cents(1999)).with_stock(25),
        Product::new("SKU-MUG", "Enamel Mug", Money::from_cents(1250)).with_stock(10),
        Product::new("SKU-HOODIE", "Zip Hoodie", Money::from_cents(4999)).with_stock(3),
        Product::new("SKU-EBOOK", "Field Guide (e-book)", Money::from_cents(900)).untracked(),
        Product::new("SKU-RETIRED", "Retired Cap", Money::from_cents(1500))
            .with_stock(40)
            .inactive(),
    ];

    let count = products.len();
    for product in products {
        store.insert_product(product).await;
    }
    tracing::info!(count, "demo catalog seeded");
}
