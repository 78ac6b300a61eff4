use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::applications::{
    dtos as applications_dtos, handlers as applications_handlers, models as applications_models,
};
use crate::features::auth;
use crate::features::catalog::handlers as catalog_handlers;
use crate::features::categories::{
    dtos as categories_dtos, handlers as categories_handlers, models as categories_models,
};
use crate::features::orders::{
    dtos as orders_dtos, handlers as orders_handlers, lifecycle, models as orders_models,
};
use crate::shared::geo::Coordinates;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handler::get_me,
        // Categories
        categories_handlers::list_categories,
        categories_handlers::get_category,
        categories_handlers::get_breadcrumbs,
        categories_handlers::create_category,
        categories_handlers::update_category,
        categories_handlers::reparent_category,
        categories_handlers::delete_category,
        // Orders
        orders_handlers::create_order,
        orders_handlers::list_my_orders,
        orders_handlers::list_assigned_orders,
        orders_handlers::get_order,
        orders_handlers::update_order,
        orders_handlers::publish_order,
        orders_handlers::cancel_order,
        orders_handlers::mark_order_done,
        orders_handlers::complete_order,
        orders_handlers::rate_customer,
        orders_handlers::raise_dispute,
        orders_handlers::resolve_dispute,
        // Applications
        applications_handlers::submit_application,
        applications_handlers::list_order_applications,
        applications_handlers::list_my_applications,
        applications_handlers::accept_application,
        applications_handlers::reject_application,
        applications_handlers::withdraw_application,
        applications_handlers::mark_application_viewed,
        // Catalog
        catalog_handlers::get_feed,
        catalog_handlers::list_open_orders,
    ),
    components(
        schemas(
            // Shared
            Meta,
            Coordinates,
            // Auth
            auth::dto::MeResponseDto,
            auth::model::UserType,
            auth::model::Capabilities,
            ApiResponse<auth::dto::MeResponseDto>,
            // Categories
            categories_models::Locale,
            categories_dtos::CategoryResponseDto,
            categories_dtos::CategoryTreeDto,
            categories_dtos::BreadcrumbDto,
            categories_dtos::CreateCategoryDto,
            categories_dtos::UpdateCategoryDto,
            categories_dtos::ReparentCategoryDto,
            ApiResponse<categories_dtos::CategoryResponseDto>,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            ApiResponse<Vec<categories_dtos::BreadcrumbDto>>,
            // Orders
            orders_models::OrderStatus,
            orders_models::PriceType,
            orders_models::Urgency,
            lifecycle::DisputeOutcome,
            orders_dtos::OrderResponseDto,
            orders_dtos::CreateOrderDto,
            orders_dtos::UpdateOrderDto,
            orders_dtos::CancelOrderDto,
            orders_dtos::RatingDto,
            orders_dtos::ResolveDisputeDto,
            ApiResponse<orders_dtos::OrderResponseDto>,
            ApiResponse<Vec<orders_dtos::OrderResponseDto>>,
            // Applications
            applications_models::ApplicationStatus,
            applications_dtos::ApplicationResponseDto,
            applications_dtos::SubmitApplicationDto,
            applications_dtos::RejectApplicationDto,
            ApiResponse<applications_dtos::ApplicationResponseDto>,
            ApiResponse<Vec<applications_dtos::ApplicationResponseDto>>,
        )
    ),
    tags(
        (name = "auth", description = "Current user and capabilities"),
        (name = "categories", description = "Service category taxonomy"),
        (name = "orders", description = "Customer orders and their lifecycle"),
        (name = "applications", description = "Executor bids on orders"),
        (name = "catalog", description = "Order discovery for executors"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Marketplace API",
        version = "0.1.0",
        description = "API documentation for the services marketplace",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_marketplace_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/orders/{id}/publish",
            "/api/applications/{id}/accept",
            "/api/catalog/feed",
            "/api/categories/{slug}/breadcrumbs",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
