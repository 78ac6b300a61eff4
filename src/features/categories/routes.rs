use std::sync::Arc;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::features::categories::handlers;
use crate::features::categories::services::CategoryService;

/// Create routes for the categories feature
///
/// Note: These routes are public (no authentication required)
pub fn routes(service: Arc<CategoryService>) -> Router {
    Router::new()
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/categories/{slug}", get(handlers::get_category))
        .route(
            "/api/categories/{slug}/breadcrumbs",
            get(handlers::get_breadcrumbs),
        )
        .with_state(service)
}

/// Taxonomy management routes (require auth middleware to be applied by caller)
pub fn admin_routes(service: Arc<CategoryService>) -> Router {
    Router::new()
        .route("/api/admin/categories", post(handlers::create_category))
        .route(
            "/api/admin/categories/{id}",
            patch(handlers::update_category).delete(handlers::delete_category),
        )
        .route(
            "/api/admin/categories/{id}/parent",
            put(handlers::reparent_category),
        )
        .with_state(service)
}
