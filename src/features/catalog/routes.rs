use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::catalog::handlers;
use crate::features::catalog::services::CatalogService;

/// Public browsing routes
pub fn routes(service: Arc<CatalogService>) -> Router {
    Router::new()
        .route("/api/catalog/open-orders", get(handlers::list_open_orders))
        .with_state(service)
}

/// Executor feed (require auth middleware to be applied by caller)
pub fn protected_routes(service: Arc<CatalogService>) -> Router {
    Router::new()
        .route("/api/catalog/feed", get(handlers::get_feed))
        .with_state(service)
}
