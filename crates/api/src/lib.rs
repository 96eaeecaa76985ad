//! HTTP surface for the storefront back-office.
//!
//! Thin JSON handlers over the checkout workflows, the catalog, the purchase
//! ledger and the profit reporter, with request tracing and Prometheus
//! metrics. Callers are identified by headers set by an upstream gateway
//! (see [`extract`]).

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, LogFormat};
pub use error::ApiError;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/products",
            post(routes::products::create::<S>).get(routes::products::list::<S>),
        )
        .route(
            "/products/{id}/restock",
            post(routes::products::restock::<S>),
        )
        .route(
            "/products/cost-prices",
            post(routes::products::update_cost_prices::<S>),
        )
        .route(
            "/orders",
            post(routes::orders::place::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/mine", get(routes::orders::mine::<S>))
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>)
                .patch(routes::orders::update::<S>)
                .delete(routes::orders::delete::<S>),
        )
        .route("/users/register", post(routes::users::register::<S>))
        .route("/users/verify", post(routes::users::verify::<S>))
        .route(
            "/settings/delivery-price",
            get(routes::settings::get_delivery_price::<S>)
                .put(routes::settings::set_delivery_price::<S>),
        )
        .route(
            "/purchases",
            post(routes::purchases::record::<S>).get(routes::purchases::list::<S>),
        )
        .route(
            "/purchases/{id}",
            put(routes::purchases::amend::<S>).delete(routes::purchases::delete::<S>),
        )
        .route("/reports/profit", get(routes::reports::profit::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
