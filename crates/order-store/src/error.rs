use common::ProductId;
use thiserror::Error;

/// Errors that can occur when talking to a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional stock decrement was refused because it would have
    /// taken the count below zero.
    #[error(
        "Stock conflict for product {product_id}: {requested} requested, {available} available"
    )]
    StockConflict {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },

    /// The generated order number is already taken.
    #[error("Duplicate order number: {0}")]
    DuplicateOrderNumber(String),

    /// A record that a write depends on does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The backend refused or failed the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be mapped back to the domain.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
