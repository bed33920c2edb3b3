//! Order fulfillment service.
//!
//! One process hosts the order intake API, the auth check the edge proxy
//! calls, and the background consumers (saga, assembly, notifications) that
//! move paid orders through the bus. Structured logging goes through
//! `tracing`, metrics through the Prometheus exporter.

pub mod config;
pub mod demo;
pub mod error;
pub mod routes;
pub mod workers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::orders::AppState;

/// Creates the order API router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/pay", post(routes::orders::pay))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
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

/// Creates the auth check router the edge proxy calls on every request.
pub fn create_gateway_app(gateway: Arc<gateway::AuthGateway>) -> Router {
    gateway::http::router(gateway).layer(TraceLayer::new_for_http())
}
