//! Storage collaborators for order placement.
//!
//! Each store is an independent remote resource: there is no transaction
//! spanning two calls, which is why checkout coordinates them as a saga.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, StoreOp};
pub use postgres::PostgresStore;
pub use store::{AddressStore, CartStore, CheckoutStore, OrderStore, ProductStore};
