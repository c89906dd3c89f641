use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AddressId, CustomerId, LineItemId, OrderId, ProductId};
use domain::{
    Address, Money, Order, OrderLineItem, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus,
    Product,
};
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::store::{AddressStore, CartStore, OrderStore, ProductStore};
use crate::{Result, StoreError};

const ORDER_COLUMNS: &str = "id, order_number, customer_id, status, payment_status, \
     subtotal_cents, tax_cents, shipping_cents, total_cents, shipping_address_id, \
     billing_address_id, payment_method, notes, created_at";

/// PostgreSQL-backed store.
///
/// Every method is a single statement or a transaction over one table, which
/// mirrors what a hosted data API offers: no transaction spans two calls.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("checkout migrations applied");
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            available_quantity: row.try_get("available_quantity")?,
            tracks_quantity: row.try_get("tracks_quantity")?,
            is_active: row.try_get("is_active")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let payment_status: String = row.try_get("payment_status")?;
        let payment_method: Option<String> = row.try_get("payment_method")?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_number: OrderNumber::new(row.try_get::<String, _>("order_number")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            status: OrderStatus::parse(&status)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown order status {status}")))?,
            payment_status: PaymentStatus::parse(&payment_status).ok_or_else(|| {
                StoreError::Corrupt(format!("unknown payment status {payment_status}"))
            })?,
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            tax_amount: Money::from_cents(row.try_get("tax_cents")?),
            shipping_amount: Money::from_cents(row.try_get("shipping_cents")?),
            total_amount: Money::from_cents(row.try_get("total_cents")?),
            shipping_address_id: row
                .try_get::<Option<Uuid>, _>("shipping_address_id")?
                .map(AddressId::from_uuid),
            billing_address_id: row
                .try_get::<Option<Uuid>, _>("billing_address_id")?
                .map(AddressId::from_uuid),
            payment_method: match payment_method {
                Some(m) => Some(PaymentMethod::parse(&m).ok_or_else(|| {
                    StoreError::Corrupt(format!("unknown payment method {m}"))
                })?),
                None => None,
            },
            notes: row.try_get("notes")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn row_to_line_item(row: PgRow) -> Result<OrderLineItem> {
        let quantity: i64 = row.try_get("quantity")?;
        Ok(OrderLineItem {
            id: LineItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            quantity: u32::try_from(quantity)
                .map_err(|_| StoreError::Corrupt(format!("line item quantity {quantity}")))?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            line_total: Money::from_cents(row.try_get("line_total_cents")?),
        })
    }

    fn row_to_address(row: PgRow) -> Result<Address> {
        Ok(Address {
            id: AddressId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            full_name: row.try_get("full_name")?,
            line1: row.try_get("line1")?,
            line2: row.try_get("line2")?,
            city: row.try_get("city")?,
            region: row.try_get("region")?,
            postal_code: row.try_get("postal_code")?,
            country: row.try_get("country")?,
        })
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();

        let rows = sqlx::query(
            r#"
            SELECT id, name, unit_price_cents, available_quantity, tracks_quantity, is_active
            FROM products
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn decrement_stock(&self, product_id: &ProductId, quantity: u32) -> Result<i64> {
        let requested = i64::from(quantity);

        // The WHERE clause makes the check and the write one atomic statement.
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET available_quantity = available_quantity - $2
            WHERE id = $1 AND available_quantity >= $2
            RETURNING available_quantity
            "#,
        )
        .bind(product_id.as_str())
        .bind(requested)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(new_quantity) = updated {
            return Ok(new_quantity);
        }

        let available: Option<i64> =
            sqlx::query_scalar("SELECT available_quantity FROM products WHERE id = $1")
                .bind(product_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match available {
            Some(available) => {
                metrics::counter!("store_stock_conflicts_total").increment(1);
                Err(StoreError::StockConflict {
                    product_id: product_id.clone(),
                    requested: quantity,
                    available,
                })
            }
            None => Err(StoreError::NotFound(format!("product {product_id}"))),
        }
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, customer_id, status, payment_status,
                subtotal_cents, tax_cents, shipping_cents, total_cents, shipping_address_id,
                billing_address_id, payment_method, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.order_number.as_str())
        .bind(order.customer_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.subtotal.cents())
        .bind(order.tax_amount.cents())
        .bind(order.shipping_amount.cents())
        .bind(order.total_amount.cents())
        .bind(order.shipping_address_id.map(|id| id.as_uuid()))
        .bind(order.billing_address_id.map(|id| id.as_uuid()))
        .bind(order.payment_method.map(|m| m.as_str()))
        .bind(order.notes.as_deref())
        .bind(order.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_order_number")
            {
                return StoreError::DuplicateOrderNumber(order.order_number.to_string());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn insert_line_items(&self, items: &[OrderLineItem]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_line_items (id, order_id, product_id, quantity,
                    unit_price_cents, line_total_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.order_id.as_uuid())
            .bind(item.product_id.as_str())
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.cents())
            .bind(item.line_total.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn get_line_items(&self, order_id: OrderId) -> Result<Vec<OrderLineItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price_cents, line_total_cents
            FROM order_line_items
            WHERE order_id = $1
            ORDER BY product_id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line_item).collect()
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn remove_cart_items(
        &self,
        customer_id: CustomerId,
        product_ids: &[ProductId],
    ) -> Result<u64> {
        let ids: Vec<String> = product_ids
            .iter()
            .map(|id| id.as_str().to_string())
            .collect();

        let result =
            sqlx::query("DELETE FROM cart_items WHERE customer_id = $1 AND product_id = ANY($2)")
                .bind(customer_id.as_uuid())
                .bind(&ids)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AddressStore for PostgresStore {
    async fn get_address(&self, address_id: AddressId) -> Result<Option<Address>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, customer_id, full_name, line1, line2, city, region, postal_code, country
            FROM addresses
            WHERE id = $1
            "#,
        )
        .bind(address_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_address).transpose()
    }
}
