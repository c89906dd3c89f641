//! Order placement endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use checkout::{CheckoutCoordinator, OrderDetails, OrderItemView, OrderView, PlaceOrder};
use common::{AddressId, CustomerId};
use domain::{Address, LineItemRequest, PaymentMethod};
use order_store::CheckoutStore;
use serde::{Deserialize, Serialize};

use crate::auth::{IdentityResolver, authenticate};
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub coordinator: Arc<CheckoutCoordinator<S>>,
    pub identity: Arc<dyn IdentityResolver>,
    pub request_timeout: Duration,
}

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub items: Vec<LineItemBody>,
    pub shipping_address_id: Option<AddressId>,
    pub billing_address_id: Option<AddressId>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemBody {
    pub product_id: String,
    pub quantity: u32,
}

impl PlaceOrderRequest {
    fn into_command(self, customer_id: CustomerId) -> PlaceOrder {
        let items = self
            .items
            .into_iter()
            .map(|item| LineItemRequest::new(item.product_id, item.quantity))
            .collect();

        PlaceOrder::new(customer_id, items).with_details(OrderDetails {
            shipping_address_id: self.shipping_address_id,
            billing_address_id: self.billing_address_id,
            payment_method: self.payment_method,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
        })
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct OrderPlacedData {
    pub order: OrderResponse,
    pub message: &'static str,
}

/// Amounts are sent twice: exact integer cents (`*Cents`) and the same value
/// as a two-decimal string, so clients never parse money as a float.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub customer_id: String,
    pub status: &'static str,
    pub payment_status: &'static str,
    pub subtotal_cents: i64,
    pub tax_amount_cents: i64,
    pub shipping_amount_cents: i64,
    pub total_amount_cents: i64,
    pub subtotal: String,
    pub tax_amount: String,
    pub shipping_amount: String,
    pub total_amount: String,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
    pub shipping_address: Option<AddressResponse>,
    pub billing_address: Option<AddressResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: String,
    pub product_id: String,
    pub product_name: Option<String>,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub unit_price: String,
    pub line_total: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressResponse {
    pub id: String,
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl From<OrderView> for OrderResponse {
    fn from(view: OrderView) -> Self {
        let OrderView {
            order,
            items,
            shipping_address,
            billing_address,
        } = view;

        Self {
            id: order.id.to_string(),
            order_number: order.order_number.to_string(),
            customer_id: order.customer_id.to_string(),
            status: order.status.as_str(),
            payment_status: order.payment_status.as_str(),
            subtotal_cents: order.subtotal.cents(),
            tax_amount_cents: order.tax_amount.cents(),
            shipping_amount_cents: order.shipping_amount.cents(),
            total_amount_cents: order.total_amount.cents(),
            subtotal: order.subtotal.to_decimal_string(),
            tax_amount: order.tax_amount.to_decimal_string(),
            shipping_amount: order.shipping_amount.to_decimal_string(),
            total_amount: order.total_amount.to_decimal_string(),
            payment_method: order.payment_method,
            notes: order.notes,
            created_at: order.created_at,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            shipping_address: shipping_address.map(AddressResponse::from),
            billing_address: billing_address.map(AddressResponse::from),
        }
    }
}

impl From<OrderItemView> for OrderItemResponse {
    fn from(view: OrderItemView) -> Self {
        Self {
            id: view.item.id.to_string(),
            product_id: view.item.product_id.to_string(),
            product_name: view.product_name,
            quantity: view.item.quantity,
            unit_price_cents: view.item.unit_price.cents(),
            line_total_cents: view.item.line_total.cents(),
            unit_price: view.item.unit_price.to_decimal_string(),
            line_total: view.item.line_total.to_decimal_string(),
        }
    }
}

impl From<Address> for AddressResponse {
    fn from(address: Address) -> Self {
        Self {
            id: address.id.to_string(),
            full_name: address.full_name,
            line1: address.line1,
            line2: address.line2,
            city: address.city,
            region: address.region,
            postal_code: address.postal_code,
            country: address.country,
        }
    }
}

// -- Handlers --

/// POST /orders: place an order for the authenticated customer.
#[tracing::instrument(skip(state, headers, body))]
pub async fn place<S: CheckoutStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse<OrderPlacedData>>, ApiError> {
    let customer_id = authenticate(state.identity.as_ref(), &headers).await?;
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let placed = state
        .coordinator
        .place_order_within(request.into_command(customer_id), state.request_timeout)
        .await?;

    tracing::info!(
        %customer_id,
        order_number = %placed.order.order.order_number,
        adjustments_failed = placed.adjustments.failed.len(),
        cart_cleared = placed.cart.is_cleared(),
        "order placed via api"
    );

    Ok(Json(SuccessResponse {
        success: true,
        data: OrderPlacedData {
            order: placed.order.into(),
            message: "Order placed successfully",
        },
    }))
}
