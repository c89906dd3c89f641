//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::auth::StaticIdentityResolver;
use api::config::Config;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use common::{AddressId, CustomerId, ProductId};
use domain::{Address, Money, Product};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryStore, StoreOp};
use tower::ServiceExt;

const TOKEN: &str = "test-token";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    store: InMemoryStore,
    customer_id: CustomerId,
}

async fn setup_with(config: Config) -> TestApp {
    let store = InMemoryStore::new();
    store
        .insert_product(Product::new("P1", "Widget", Money::from_cents(1000)).with_stock(5))
        .await;
    store
        .insert_product(
            Product::new("OLD", "Retired", Money::from_cents(100))
                .with_stock(5)
                .inactive(),
        )
        .await;

    let customer_id = CustomerId::new();
    store.add_to_cart(customer_id, ProductId::new("P1"), 2).await;

    let identity = Arc::new(StaticIdentityResolver::new([(TOKEN.to_string(), customer_id)]));
    let state = api::create_state(store.clone(), &config, identity);
    let app = api::create_app(state, get_metrics_handle());

    TestApp {
        app,
        store,
        customer_id,
    }
}

async fn setup() -> TestApp {
    setup_with(Config::default()).await
}

fn order_request(token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/orders")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "checkout-api");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_place_order() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(order_request(
            Some(TOKEN),
            serde_json::json!({
                "items": [{ "productId": "P1", "quantity": 2 }],
                "paymentMethod": "card",
                "notes": "front porch"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["message"], "Order placed successfully");

    let order = &json["data"]["order"];
    assert_eq!(order["subtotalCents"], 2000);
    assert_eq!(order["taxAmountCents"], 160);
    assert_eq!(order["shippingAmountCents"], 999);
    assert_eq!(order["totalAmountCents"], 3159);
    assert_eq!(order["subtotal"], "20.00");
    assert_eq!(order["taxAmount"], "1.60");
    assert_eq!(order["shippingAmount"], "9.99");
    assert_eq!(order["totalAmount"], "31.59");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["paymentMethod"], "card");
    assert_eq!(order["notes"], "front porch");
    assert_eq!(order["customerId"], t.customer_id.to_string());
    assert!(order["orderNumber"].as_str().unwrap().starts_with("ORD-"));
    assert!(order["shippingAddress"].is_null());

    let items = order["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["productId"], "P1");
    assert_eq!(items[0]["productName"], "Widget");
    assert_eq!(items[0]["unitPriceCents"], 1000);
    assert_eq!(items[0]["lineTotalCents"], 2000);
    assert_eq!(items[0]["unitPrice"], "10.00");
    assert_eq!(items[0]["lineTotal"], "20.00");

    let p1 = t.store.product(&ProductId::new("P1")).await.unwrap();
    assert_eq!(p1.available_quantity, 3);
    assert!(t.store.cart_items(t.customer_id).await.is_empty());
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(order_request(
            None,
            serde_json::json!({ "items": [{ "productId": "P1", "quantity": 1 }] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "UNAUTHORIZED");
    assert_eq!(t.store.order_count().await, 0);
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(order_request(
            Some("stolen"),
            serde_json::json!({ "items": [{ "productId": "P1", "quantity": 1 }] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_cart_is_bad_request() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(order_request(Some(TOKEN), serde_json::json!({ "items": [] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "EMPTY_CART");
}

#[tokio::test]
async fn test_insufficient_inventory_is_bad_request() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(order_request(
            Some(TOKEN),
            serde_json::json!({ "items": [{ "productId": "P1", "quantity": 6 }] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["code"], "INSUFFICIENT_INVENTORY");

    let p1 = t.store.product(&ProductId::new("P1")).await.unwrap();
    assert_eq!(p1.available_quantity, 5);
}

#[tokio::test]
async fn test_inactive_product_is_bad_request() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(order_request(
            Some(TOKEN),
            serde_json::json!({ "items": [{ "productId": "OLD", "quantity": 1 }] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "PRODUCT_INACTIVE");
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(order_request(
            Some(TOKEN),
            serde_json::json!({ "items": [{ "productId": "GHOST", "quantity": 1 }] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["code"], "PRODUCTS_NOT_FOUND");
    assert!(json["error"].as_str().unwrap().contains("GHOST"));
    assert_eq!(t.store.order_count().await, 0);
}

#[tokio::test]
async fn test_foreign_address_is_bad_request() {
    let t = setup().await;
    let foreign = Address {
        id: AddressId::new(),
        customer_id: CustomerId::new(),
        full_name: "Someone Else".to_string(),
        line1: "1 Private Rd".to_string(),
        line2: None,
        city: "Elsewhere".to_string(),
        region: None,
        postal_code: "99999".to_string(),
        country: "US".to_string(),
    };
    t.store.insert_address(foreign.clone()).await;

    let response = t
        .app
        .oneshot(order_request(
            Some(TOKEN),
            serde_json::json!({
                "items": [{ "productId": "P1", "quantity": 1 }],
                "shippingAddressId": foreign.id.to_string()
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["code"], "INVALID_ADDRESS");
    assert!(!json.to_string().contains("1 Private Rd"));
    assert_eq!(t.store.order_count().await, 0);
}

#[tokio::test]
async fn test_timeout_during_failed_write_reports_no_order() {
    let t = setup_with(Config {
        request_timeout: Duration::from_millis(50),
        ..Config::default()
    })
    .await;
    t.store
        .set_latency(StoreOp::LineItemInsert, Duration::from_millis(200))
        .await;
    t.store.fail_on(StoreOp::LineItemInsert, true).await;

    let response = t
        .app
        .oneshot(order_request(
            Some(TOKEN),
            serde_json::json!({ "items": [{ "productId": "P1", "quantity": 1 }] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let code = json_body(response).await["code"].clone();
    assert_ne!(code, "ORDER_CREATED_RESPONSE_UNAVAILABLE");
    assert_eq!(t.store.order_count().await, 0);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {TOKEN}"))
                .body(Body::from("{ not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_write_failure_is_generic_server_error() {
    let t = setup().await;
    t.store.fail_on(StoreOp::LineItemInsert, true).await;

    let response = t
        .app
        .oneshot(order_request(
            Some(TOKEN),
            serde_json::json!({ "items": [{ "productId": "P1", "quantity": 1 }] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["code"], "ORDER_PLACEMENT_FAILED");
    assert!(!json["error"].as_str().unwrap().contains("line_item_insert"));
    assert_eq!(t.store.order_count().await, 0);
}

#[tokio::test]
async fn test_assembly_failure_has_distinct_code() {
    let t = setup().await;
    t.store.fail_on(StoreOp::OrderRead, true).await;

    let response = t
        .app
        .oneshot(order_request(
            Some(TOKEN),
            serde_json::json!({ "items": [{ "productId": "P1", "quantity": 1 }] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["code"], "ORDER_CREATED_RESPONSE_UNAVAILABLE");
    assert_eq!(t.store.order_count().await, 1);
}

#[tokio::test]
async fn test_timeout_before_commit() {
    let t = setup_with(Config {
        request_timeout: Duration::from_millis(50),
        ..Config::default()
    })
    .await;
    t.store
        .set_latency(StoreOp::ProductLookup, Duration::from_millis(200))
        .await;

    let response = t
        .app
        .oneshot(order_request(
            Some(TOKEN),
            serde_json::json!({ "items": [{ "productId": "P1", "quantity": 1 }] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["code"], "ORDER_PLACEMENT_TIMEOUT");

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(t.store.order_count().await, 0);
}

#[tokio::test]
async fn test_cors_preflight() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/orders")
                .header("origin", "https://shop.example")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "authorization, content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    let allowed = headers["access-control-allow-headers"]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("authorization"));
    assert!(allowed.contains("content-type"));
}

#[tokio::test]
async fn test_error_responses_carry_cors_headers() {
    let t = setup().await;

    let mut request = order_request(None, serde_json::json!({ "items": [] }));
    request
        .headers_mut()
        .insert("origin", "https://shop.example".parse().unwrap());
    let response = t.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup().await;

    // Place an order first so checkout counters exist
    let _ = t
        .app
        .clone()
        .oneshot(order_request(
            Some(TOKEN),
            serde_json::json!({ "items": [{ "productId": "P1", "quantity": 1 }] }),
        ))
        .await
        .unwrap();

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("checkout_placements_total"));
}
