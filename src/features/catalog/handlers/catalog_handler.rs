use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use crate::core::error::Result;
use crate::features::auth::guards::RequireExecutor;
use crate::features::catalog::dtos::OpenOrdersQuery;
use crate::features::catalog::services::CatalogService;
use crate::features::orders::dtos::OrderResponseDto;
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// Orders near the current executor in the categories they offer
#[utoipa::path(
    get,
    path = "/api/catalog/feed",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Orders visible to the executor", body = ApiResponse<Vec<OrderResponseDto>>),
        (status = 404, description = "Executor profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn get_feed(
    RequireExecutor(user): RequireExecutor,
    State(service): State<Arc<CatalogService>>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<OrderResponseDto>>>> {
    let (orders, total) = service.feed(user.user_id, &params).await?;

    Ok(Json(ApiResponse::success(
        Some(orders),
        None,
        Some(Meta::for_page(total, &params)),
    )))
}

/// Orders accepting applications
#[utoipa::path(
    get,
    path = "/api/catalog/open-orders",
    params(OpenOrdersQuery),
    responses(
        (status = 200, description = "Open, published orders", body = ApiResponse<Vec<OrderResponseDto>>),
        (status = 404, description = "Category not found")
    ),
    tag = "catalog"
)]
pub async fn list_open_orders(
    State(service): State<Arc<CatalogService>>,
    Query(query): Query<OpenOrdersQuery>,
) -> Result<Json<ApiResponse<Vec<OrderResponseDto>>>> {
    let (orders, total) = service.open_orders(&query).await?;

    Ok(Json(ApiResponse::success(
        Some(orders),
        None,
        Some(Meta::for_page(total, &query.pagination())),
    )))
}
