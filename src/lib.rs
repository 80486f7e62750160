pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod validation;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::domain::PricingPolicy;
use crate::ports::{BookingRepository, PaymentGateway};
use crate::services::{BookingService, InventoryService, ReconciliationService};

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn BookingRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub bookings: BookingService,
    pub reconciliation: ReconciliationService,
    pub inventory: InventoryService,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        gateway: Arc<dyn PaymentGateway>,
        pricing: PricingPolicy,
        currency: String,
    ) -> Self {
        Self {
            bookings: BookingService::new(repository.clone(), pricing),
            reconciliation: ReconciliationService::new(
                repository.clone(),
                gateway.clone(),
                currency,
            ),
            inventory: InventoryService::new(repository.clone()),
            repository,
            gateway,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/bookings",
            post(handlers::bookings::create_booking).get(handlers::bookings::list_bookings),
        )
        .route("/bookings/:id", get(handlers::bookings::get_booking))
        .route("/bookings/:id/order", post(handlers::bookings::open_order))
        .route("/bookings/:id/checkout", get(handlers::bookings::checkout))
        .route("/bookings/:id/cancel", post(handlers::bookings::cancel_booking))
        .route("/bookings/:id/complete", post(handlers::bookings::complete_booking))
        .route("/payments/confirm", post(handlers::payments::confirm_payment))
        .route("/payments/failure", post(handlers::payments::record_failure))
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .with_state(state)
}

/// CORS for browser checkouts. Without an allow-list any origin is accepted.
pub fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let origin = match allowed_origins {
        Some(origins) => AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok())
                .collect::<Vec<_>>(),
        ),
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
