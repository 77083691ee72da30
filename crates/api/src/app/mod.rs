//! HTTP application wiring.
//!
//! - `services.rs`: store selection and the services built on it
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request bodies and query strings
//! - `errors.rs`: the JSON error envelope and status mapping

use std::sync::Arc;

use axum::{Extension, Router, middleware::from_fn, middleware::from_fn_with_state};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, build_services};

/// Build the full router over already-constructed services.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let customer = routes::customer_router().route_layer(from_fn_with_state(
        services.clone(),
        middleware::require_customer,
    ));
    let admin = routes::admin_router().route_layer(from_fn_with_state(
        services.clone(),
        middleware::require_admin,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(customer)
        .merge(admin)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(middleware::log_requests))
                .layer(Extension(services)),
        )
}
