use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::extractor::ValidJson;
use crate::features::auth::guards::{RequireCustomer, RequireDisputeResolver, RequireExecutor};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::orders::dtos::{
    CancelOrderDto, CreateOrderDto, OrderListQuery, OrderResponseDto, RatingDto,
    ResolveDisputeDto, UpdateOrderDto,
};
use crate::features::orders::services::OrderService;
use crate::shared::types::{ApiResponse, Meta};

/// Create a draft order
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderDto,
    responses(
        (status = 201, description = "Draft created", body = ApiResponse<OrderResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Category not found")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn create_order(
    RequireCustomer(user): RequireCustomer,
    State(service): State<Arc<OrderService>>,
    ValidJson(dto): ValidJson<CreateOrderDto>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponseDto>>)> {

    let order = service.create(&user.actor(), dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(order), None, None)),
    ))
}

/// List orders posted by the current customer
#[utoipa::path(
    get,
    path = "/api/orders/my",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Customer's orders", body = ApiResponse<Vec<OrderResponseDto>>)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_my_orders(
    RequireCustomer(user): RequireCustomer,
    State(service): State<Arc<OrderService>>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ApiResponse<Vec<OrderResponseDto>>>> {
    let (orders, total) = service.list_own(user.user_id, &query).await?;
    Ok(Json(ApiResponse::success(
        Some(orders),
        None,
        Some(Meta::for_page(total, &query.pagination())),
    )))
}

/// List orders assigned to the current executor
#[utoipa::path(
    get,
    path = "/api/orders/assigned",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Executor's assigned orders", body = ApiResponse<Vec<OrderResponseDto>>)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_assigned_orders(
    RequireExecutor(user): RequireExecutor,
    State(service): State<Arc<OrderService>>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ApiResponse<Vec<OrderResponseDto>>>> {
    let (orders, total) = service.list_assigned(user.user_id, &query).await?;
    Ok(Json(ApiResponse::success(
        Some(orders),
        None,
        Some(Meta::for_page(total, &query.pagination())),
    )))
}

/// Get order by ID
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order found", body = ApiResponse<OrderResponseDto>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order(
    user: AuthenticatedUser,
    State(service): State<Arc<OrderService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponseDto>>> {
    let order = service.get(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(Some(order), None, None)))
}

/// Edit a draft order
#[utoipa::path(
    patch,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderDto,
    responses(
        (status = 200, description = "Draft updated", body = ApiResponse<OrderResponseDto>),
        (status = 403, description = "Not the order's customer"),
        (status = 409, description = "Order is no longer a draft")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn update_order(
    RequireCustomer(user): RequireCustomer,
    State(service): State<Arc<OrderService>>,
    Path(id): Path<Uuid>,
    ValidJson(dto): ValidJson<UpdateOrderDto>,
) -> Result<Json<ApiResponse<OrderResponseDto>>> {

    let order = service.update(&user.actor(), id, dto).await?;
    Ok(Json(ApiResponse::success(Some(order), None, None)))
}

/// Publish a draft so executors can bid on it
#[utoipa::path(
    post,
    path = "/api/orders/{id}/publish",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order is open", body = ApiResponse<OrderResponseDto>),
        (status = 409, description = "Order is not a draft, or is locked by another request"),
        (status = 422, description = "Required fields are missing")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn publish_order(
    RequireCustomer(user): RequireCustomer,
    State(service): State<Arc<OrderService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponseDto>>> {
    let order = service.publish(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(Some(order), None, None)))
}

/// Cancel an order
///
/// The customer cancels outright. The assigned executor can only request
/// cancellation while work is in progress; the order is returned unchanged.
#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = CancelOrderDto,
    responses(
        (status = 200, description = "Order cancelled or cancellation requested", body = ApiResponse<OrderResponseDto>),
        (status = 403, description = "Not a party to the order"),
        (status = 409, description = "Order is already completed or cancelled")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn cancel_order(
    user: AuthenticatedUser,
    State(service): State<Arc<OrderService>>,
    Path(id): Path<Uuid>,
    ValidJson(dto): ValidJson<CancelOrderDto>,
) -> Result<Json<ApiResponse<OrderResponseDto>>> {

    let order = service.cancel(&user.actor(), id, dto.reason).await?;
    Ok(Json(ApiResponse::success(Some(order), None, None)))
}

/// Executor reports the work as done
#[utoipa::path(
    post,
    path = "/api/orders/{id}/done",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Awaiting customer confirmation", body = ApiResponse<OrderResponseDto>),
        (status = 403, description = "Not the assigned executor"),
        (status = 409, description = "Order is not in progress")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn mark_order_done(
    RequireExecutor(user): RequireExecutor,
    State(service): State<Arc<OrderService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponseDto>>> {
    let order = service.mark_done(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(Some(order), None, None)))
}

/// Customer confirms completion and rates the executor
#[utoipa::path(
    post,
    path = "/api/orders/{id}/complete",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = RatingDto,
    responses(
        (status = 200, description = "Order completed", body = ApiResponse<OrderResponseDto>),
        (status = 409, description = "Order is not waiting for confirmation"),
        (status = 422, description = "Rating out of range")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn complete_order(
    RequireCustomer(user): RequireCustomer,
    State(service): State<Arc<OrderService>>,
    Path(id): Path<Uuid>,
    ValidJson(dto): ValidJson<RatingDto>,
) -> Result<Json<ApiResponse<OrderResponseDto>>> {

    let order = service
        .complete(&user.actor(), id, dto.rating, dto.review)
        .await?;
    Ok(Json(ApiResponse::success(Some(order), None, None)))
}

/// Executor rates the customer of a completed order
#[utoipa::path(
    post,
    path = "/api/orders/{id}/rate-customer",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = RatingDto,
    responses(
        (status = 200, description = "Rating recorded", body = ApiResponse<OrderResponseDto>),
        (status = 409, description = "Order not completed or already rated"),
        (status = 422, description = "Rating out of range")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn rate_customer(
    RequireExecutor(user): RequireExecutor,
    State(service): State<Arc<OrderService>>,
    Path(id): Path<Uuid>,
    ValidJson(dto): ValidJson<RatingDto>,
) -> Result<Json<ApiResponse<OrderResponseDto>>> {

    let order = service
        .rate_customer(&user.actor(), id, dto.rating, dto.review)
        .await?;
    Ok(Json(ApiResponse::success(Some(order), None, None)))
}

/// Open a dispute on an order in progress or awaiting confirmation
#[utoipa::path(
    post,
    path = "/api/orders/{id}/dispute",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order disputed", body = ApiResponse<OrderResponseDto>),
        (status = 403, description = "Not a party to the order"),
        (status = 409, description = "Order cannot be disputed in its current status")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn raise_dispute(
    user: AuthenticatedUser,
    State(service): State<Arc<OrderService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponseDto>>> {
    let order = service.raise_dispute(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(Some(order), None, None)))
}

/// Settle a dispute (admin or moderator)
#[utoipa::path(
    post,
    path = "/api/orders/{id}/resolve",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = ResolveDisputeDto,
    responses(
        (status = 200, description = "Dispute resolved", body = ApiResponse<OrderResponseDto>),
        (status = 403, description = "Admin or moderator access required"),
        (status = 409, description = "Order is not disputed")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn resolve_dispute(
    RequireDisputeResolver(user): RequireDisputeResolver,
    State(service): State<Arc<OrderService>>,
    Path(id): Path<Uuid>,
    ValidJson(dto): ValidJson<ResolveDisputeDto>,
) -> Result<Json<ApiResponse<OrderResponseDto>>> {

    let order = service.resolve_dispute(&user.actor(), id, dto).await?;
    Ok(Json(ApiResponse::success(Some(order), None, None)))
}
