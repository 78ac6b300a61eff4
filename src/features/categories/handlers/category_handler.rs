use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::core::extractor::ValidJson;
use crate::features::auth::guards::RequireCategoryManager;
use crate::features::categories::dtos::{
    BreadcrumbDto, CategoryQuery, CategoryResponseDto, CategoryTreeDto, CreateCategoryDto,
    ReparentCategoryDto, UpdateCategoryDto,
};
use crate::features::categories::services::CategoryService;
use crate::shared::types::ApiResponse;

/// List all active categories
///
/// Returns categories as flat list or tree structure based on `tree` query param.
#[utoipa::path(
    get,
    path = "/api/categories",
    params(
        ("tree" = Option<bool>, Query, description = "Return tree structure if true"),
        ("locale" = Option<String>, Query, description = "Content locale: uz (default) or ru")
    ),
    responses(
        (status = 200, description = "List of categories", body = ApiResponse<Vec<CategoryResponseDto>>),
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(service): State<Arc<CategoryService>>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let value = if query.tree {
        let tree: Vec<CategoryTreeDto> = service.list_tree(query.locale).await?;
        serde_json::to_value(tree)
    } else {
        let categories = service.list(query.locale).await?;
        serde_json::to_value(categories)
    }
    .map_err(|e| AppError::Internal(format!("Failed to serialize categories: {}", e)))?;

    Ok(Json(ApiResponse::success(Some(value), None, None)))
}

/// Get category by slug
#[utoipa::path(
    get,
    path = "/api/categories/{slug}",
    params(
        ("slug" = String, Path, description = "Category slug"),
        ("locale" = Option<String>, Query, description = "Content locale: uz (default) or ru")
    ),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<CategoryResponseDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(service): State<Arc<CategoryService>>,
    Path(slug): Path<String>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let category = service.get_by_slug(&slug, query.locale).await?;
    Ok(Json(ApiResponse::success(Some(category), None, None)))
}

/// Root-to-category breadcrumb path
#[utoipa::path(
    get,
    path = "/api/categories/{slug}/breadcrumbs",
    params(
        ("slug" = String, Path, description = "Category slug"),
        ("locale" = Option<String>, Query, description = "Content locale: uz (default) or ru")
    ),
    responses(
        (status = 200, description = "Breadcrumbs from root to the category", body = ApiResponse<Vec<BreadcrumbDto>>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_breadcrumbs(
    State(service): State<Arc<CategoryService>>,
    Path(slug): Path<String>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<ApiResponse<Vec<BreadcrumbDto>>>> {
    let crumbs = service.breadcrumbs(&slug, query.locale).await?;
    Ok(Json(ApiResponse::success(Some(crumbs), None, None)))
}

/// Create a category (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CreateCategoryDto,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Parent category not found"),
        (status = 409, description = "Slug already in use")
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn create_category(
    RequireCategoryManager(_user): RequireCategoryManager,
    State(service): State<Arc<CategoryService>>,
    ValidJson(dto): ValidJson<CreateCategoryDto>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponseDto>>)> {

    let category = service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(category), None, None)),
    ))
}

/// Update category attributes (admin only)
#[utoipa::path(
    patch,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryDto,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CategoryResponseDto>),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Slug already in use")
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn update_category(
    RequireCategoryManager(_user): RequireCategoryManager,
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
    ValidJson(dto): ValidJson<UpdateCategoryDto>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {

    let category = service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(Some(category), None, None)))
}

/// Move a category under a new parent (admin only)
#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}/parent",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = ReparentCategoryDto,
    responses(
        (status = 200, description = "Category moved", body = ApiResponse<CategoryResponseDto>),
        (status = 404, description = "Category or parent not found"),
        (status = 409, description = "Move would create a cycle"),
        (status = 422, description = "Category cannot be its own parent")
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn reparent_category(
    RequireCategoryManager(_user): RequireCategoryManager,
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
    ValidJson(dto): ValidJson<ReparentCategoryDto>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let category = service.reparent(id, dto.parent_id).await?;
    Ok(Json(ApiResponse::success(Some(category), None, None)))
}

/// Delete a leaf category (admin only)
#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category still has children or is referenced")
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn delete_category(
    RequireCategoryManager(_user): RequireCategoryManager,
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
