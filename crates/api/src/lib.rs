//! HTTP API server for order placement.
//!
//! Exposes `POST /orders` on top of the checkout saga, with bearer-token
//! identity, structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod demo;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName};
use axum::routing::{get, post};
use checkout::CheckoutCoordinator;
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::CheckoutStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::IdentityResolver;
use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CheckoutStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::place::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers([
                    AUTHORIZATION,
                    CONTENT_TYPE,
                    HeaderName::from_static("x-client-info"),
                    HeaderName::from_static("apikey"),
                ]),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over `store`.
pub fn create_state<S: CheckoutStore + Clone + 'static>(
    store: S,
    config: &Config,
    identity: Arc<dyn IdentityResolver>,
) -> Arc<AppState<S>> {
    let coordinator = Arc::new(CheckoutCoordinator::new(store, config.pricing_policy()));

    Arc::new(AppState {
        coordinator,
        identity,
        request_timeout: config.request_timeout,
    })
}
