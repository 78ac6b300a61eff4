use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::applications::handlers;
use crate::features::applications::services::ApplicationService;

/// Bidding routes (require auth middleware to be applied by caller)
pub fn routes(service: Arc<ApplicationService>) -> Router {
    Router::new()
        .route(
            "/api/orders/{id}/applications",
            post(handlers::submit_application).get(handlers::list_order_applications),
        )
        .route("/api/applications/my", get(handlers::list_my_applications))
        .route(
            "/api/applications/{id}/accept",
            post(handlers::accept_application),
        )
        .route(
            "/api/applications/{id}/reject",
            post(handlers::reject_application),
        )
        .route(
            "/api/applications/{id}/withdraw",
            post(handlers::withdraw_application),
        )
        .route(
            "/api/applications/{id}/viewed",
            post(handlers::mark_application_viewed),
        )
        .with_state(service)
}
