use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::orders::handlers;
use crate::features::orders::services::OrderService;

/// Order routes (require auth middleware to be applied by caller)
pub fn routes(service: Arc<OrderService>) -> Router {
    Router::new()
        .route("/api/orders", post(handlers::create_order))
        .route("/api/orders/my", get(handlers::list_my_orders))
        .route("/api/orders/assigned", get(handlers::list_assigned_orders))
        .route(
            "/api/orders/{id}",
            get(handlers::get_order).patch(handlers::update_order),
        )
        .route("/api/orders/{id}/publish", post(handlers::publish_order))
        .route("/api/orders/{id}/cancel", post(handlers::cancel_order))
        .route("/api/orders/{id}/done", post(handlers::mark_order_done))
        .route("/api/orders/{id}/complete", post(handlers::complete_order))
        .route("/api/orders/{id}/rate-customer", post(handlers::rate_customer))
        .route("/api/orders/{id}/dispute", post(handlers::raise_dispute))
        .route("/api/orders/{id}/resolve", post(handlers::resolve_dispute))
        .with_state(service)
}
