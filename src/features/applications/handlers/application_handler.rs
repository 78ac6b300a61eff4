use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::extractor::ValidJson;
use crate::features::applications::dtos::{
    ApplicationListQuery, ApplicationResponseDto, RejectApplicationDto, SubmitApplicationDto,
};
use crate::features::applications::services::ApplicationService;
use crate::features::auth::guards::{RequireBidReviewer, RequireCustomer, RequireExecutor};
use crate::shared::types::{ApiResponse, Meta};

/// Bid on an open order
#[utoipa::path(
    post,
    path = "/api/orders/{id}/applications",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = SubmitApplicationDto,
    responses(
        (status = 201, description = "Application submitted", body = ApiResponse<ApplicationResponseDto>),
        (status = 403, description = "Cannot apply to own order"),
        (status = 409, description = "Order not accepting applications, or executor already applied")
    ),
    security(("bearer_auth" = [])),
    tag = "applications"
)]
pub async fn submit_application(
    RequireExecutor(user): RequireExecutor,
    State(service): State<Arc<ApplicationService>>,
    Path(order_id): Path<Uuid>,
    ValidJson(dto): ValidJson<SubmitApplicationDto>,
) -> Result<(StatusCode, Json<ApiResponse<ApplicationResponseDto>>)> {

    let application = service.submit(&user.actor(), order_id, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(application), None, None)),
    ))
}

/// List bids on one of the customer's orders (or any order, for moderators)
#[utoipa::path(
    get,
    path = "/api/orders/{id}/applications",
    params(("id" = Uuid, Path, description = "Order ID"), ApplicationListQuery),
    responses(
        (status = 200, description = "Applications on the order", body = ApiResponse<Vec<ApplicationResponseDto>>),
        (status = 403, description = "Neither the order's customer nor a moderator"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "applications"
)]
pub async fn list_order_applications(
    RequireBidReviewer(user): RequireBidReviewer,
    State(service): State<Arc<ApplicationService>>,
    Path(order_id): Path<Uuid>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<Json<ApiResponse<Vec<ApplicationResponseDto>>>> {
    let (applications, total) = service
        .list_for_order(&user.actor(), order_id, &query)
        .await?;

    Ok(Json(ApiResponse::success(
        Some(applications),
        None,
        Some(Meta::for_page(total, &query.pagination())),
    )))
}

/// List the current executor's applications
#[utoipa::path(
    get,
    path = "/api/applications/my",
    params(ApplicationListQuery),
    responses(
        (status = 200, description = "Executor's applications", body = ApiResponse<Vec<ApplicationResponseDto>>)
    ),
    security(("bearer_auth" = [])),
    tag = "applications"
)]
pub async fn list_my_applications(
    RequireExecutor(user): RequireExecutor,
    State(service): State<Arc<ApplicationService>>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<Json<ApiResponse<Vec<ApplicationResponseDto>>>> {
    let (applications, total) = service.list_own(user.user_id, &query).await?;

    Ok(Json(ApiResponse::success(
        Some(applications),
        None,
        Some(Meta::for_page(total, &query.pagination())),
    )))
}

/// Accept a bid
///
/// Assigns the executor, starts the order and rejects every other pending bid.
#[utoipa::path(
    post,
    path = "/api/applications/{id}/accept",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application accepted", body = ApiResponse<ApplicationResponseDto>),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Order already assigned, application not pending, or order locked")
    ),
    security(("bearer_auth" = [])),
    tag = "applications"
)]
pub async fn accept_application(
    RequireCustomer(user): RequireCustomer,
    State(service): State<Arc<ApplicationService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ApplicationResponseDto>>> {
    let application = service.accept(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(Some(application), None, None)))
}

/// Reject a pending bid
#[utoipa::path(
    post,
    path = "/api/applications/{id}/reject",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = RejectApplicationDto,
    responses(
        (status = 200, description = "Application rejected", body = ApiResponse<ApplicationResponseDto>),
        (status = 409, description = "Application not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "applications"
)]
pub async fn reject_application(
    RequireCustomer(user): RequireCustomer,
    State(service): State<Arc<ApplicationService>>,
    Path(id): Path<Uuid>,
    ValidJson(dto): ValidJson<RejectApplicationDto>,
) -> Result<Json<ApiResponse<ApplicationResponseDto>>> {

    let application = service.reject(&user.actor(), id, dto.reason).await?;
    Ok(Json(ApiResponse::success(Some(application), None, None)))
}

/// Withdraw own pending bid
#[utoipa::path(
    post,
    path = "/api/applications/{id}/withdraw",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application withdrawn", body = ApiResponse<ApplicationResponseDto>),
        (status = 403, description = "Not the applicant"),
        (status = 409, description = "Application not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "applications"
)]
pub async fn withdraw_application(
    RequireExecutor(user): RequireExecutor,
    State(service): State<Arc<ApplicationService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ApplicationResponseDto>>> {
    let application = service.withdraw(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(Some(application), None, None)))
}

/// Mark a bid as seen by the customer
#[utoipa::path(
    post,
    path = "/api/applications/{id}/viewed",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application marked as viewed", body = ApiResponse<ApplicationResponseDto>)
    ),
    security(("bearer_auth" = [])),
    tag = "applications"
)]
pub async fn mark_application_viewed(
    RequireCustomer(user): RequireCustomer,
    State(service): State<Arc<ApplicationService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ApplicationResponseDto>>> {
    let application = service.mark_viewed(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(Some(application), None, None)))
}
