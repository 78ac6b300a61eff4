use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::core::error::AppError;
use crate::features::orders::lifecycle::DisputeOutcome;
use crate::features::orders::models::{Order, OrderStatus, PriceType, Urgency};
use crate::shared::geo::{Coordinates, Locatable};
use crate::shared::types::{default_page, default_page_size, PaginationQuery};

/// Response DTO for order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponseDto {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub category_id: Uuid,
    pub executor_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub price_type: Option<PriceType>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub urgency: Urgency,
    pub address: Option<String>,
    pub location: Option<Coordinates>,
    pub status: OrderStatus,
    pub is_published: bool,
    pub applications_count: i32,
    pub views_count: i32,
    pub preferred_start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub actual_start_date: Option<DateTime<Utc>>,
    pub actual_end_date: Option<DateTime<Utc>>,
    pub customer_rating: Option<i16>,
    pub customer_review: Option<String>,
    pub executor_rating: Option<i16>,
    pub executor_review: Option<String>,
    pub is_fully_rated: bool,
    pub cancellation_reason: Option<String>,
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponseDto {
    fn from(o: Order) -> Self {
        let location = o.coordinates();
        let is_fully_rated = o.is_fully_rated();
        Self {
            id: o.id,
            customer_id: o.customer_id,
            category_id: o.category_id,
            executor_id: o.executor_id,
            title: o.title,
            description: o.description,
            price_type: o.price_type,
            budget_min: o.budget_min,
            budget_max: o.budget_max,
            urgency: o.urgency,
            address: o.address,
            location,
            status: o.status,
            is_published: o.is_published,
            applications_count: o.applications_count,
            views_count: o.views_count,
            preferred_start_date: o.preferred_start_date,
            deadline: o.deadline,
            actual_start_date: o.actual_start_date,
            actual_end_date: o.actual_end_date,
            customer_rating: o.customer_rating,
            customer_review: o.customer_review,
            executor_rating: o.executor_rating,
            executor_review: o.executor_review,
            is_fully_rated,
            cancellation_reason: o.cancellation_reason,
            attachments: o.attachments,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

fn validate_budget(min: Option<Decimal>, max: Option<Decimal>) -> Result<(), ValidationError> {
    if min.is_some_and(|v| v.is_sign_negative()) || max.is_some_and(|v| v.is_sign_negative()) {
        return Err(ValidationError::new("negative_budget")
            .with_message("Budget cannot be negative".into()));
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ValidationError::new("budget_range")
                .with_message("budget_min must not exceed budget_max".into()));
        }
    }
    Ok(())
}

fn validate_location(lat: Option<f64>, lon: Option<f64>) -> Result<(), ValidationError> {
    if lat.is_some() != lon.is_some() {
        return Err(ValidationError::new("location")
            .with_message("latitude and longitude must be given together".into()));
    }
    Ok(())
}

fn validate_create(dto: &CreateOrderDto) -> Result<(), ValidationError> {
    validate_budget(dto.budget_min, dto.budget_max)?;
    validate_location(dto.latitude, dto.longitude)
}

fn validate_update(dto: &UpdateOrderDto) -> Result<(), ValidationError> {
    validate_budget(dto.budget_min, dto.budget_max)?;
    validate_location(dto.latitude, dto.longitude)
}

/// Request DTO for creating a draft order.
///
/// Drafts may be saved incomplete; completeness is checked on publish.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create"))]
pub struct CreateOrderDto {
    pub category_id: Uuid,
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    #[serde(default)]
    pub title: String,
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    #[serde(default)]
    pub description: String,
    pub price_type: Option<PriceType>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    #[serde(default)]
    pub urgency: Urgency,
    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,
    pub preferred_start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    #[validate(length(max = 10, message = "At most 10 attachments are allowed"))]
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Request DTO for editing a draft order; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_update"))]
pub struct UpdateOrderDto {
    pub category_id: Option<Uuid>,
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
    pub price_type: Option<PriceType>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub urgency: Option<Urgency>,
    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,
    pub preferred_start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    #[validate(length(max = 10, message = "At most 10 attachments are allowed"))]
    pub attachments: Option<Vec<String>>,
}

impl UpdateOrderDto {
    /// Budget range once this edit is applied on top of the stored draft.
    /// A lone bound can still cross the bound already stored.
    pub fn merged_budget(
        &self,
        current: &Order,
    ) -> Result<(Option<Decimal>, Option<Decimal>), AppError> {
        let min = self.budget_min.or(current.budget_min);
        let max = self.budget_max.or(current.budget_max);

        validate_budget(min, max).map_err(|_| {
            AppError::Validation(format!(
                "budget_min must not exceed budget_max (budget_min {}, budget_max {})",
                min.unwrap_or_default(),
                max.unwrap_or_default()
            ))
        })?;
        Ok((min, max))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CancelOrderDto {
    #[validate(length(max = 1000, message = "Reason must be at most 1000 characters"))]
    pub reason: Option<String>,
}

/// Rating left by one side of a finished order
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RatingDto {
    /// 1 to 5
    pub rating: i16,
    #[validate(length(max = 2000, message = "Review must be at most 2000 characters"))]
    pub review: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ResolveDisputeDto {
    pub outcome: DisputeOutcome,
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: Option<String>,
}

/// Query params for listing a user's own orders
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct OrderListQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    /// Items per page
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
    /// Filter by status
    pub status: Option<OrderStatus>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::orders::models::test_order;

    fn create_dto() -> CreateOrderDto {
        CreateOrderDto {
            category_id: Uuid::new_v4(),
            title: "Paint two rooms".to_string(),
            description: "About 40 m2".to_string(),
            price_type: Some(PriceType::Fixed),
            budget_min: Some(Decimal::from(300_000)),
            budget_max: Some(Decimal::from(500_000)),
            urgency: Urgency::Normal,
            address: Some("Mirzo Ulugbek".to_string()),
            latitude: Some(41.33),
            longitude: Some(69.33),
            preferred_start_date: None,
            deadline: None,
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_valid_create_dto() {
        assert!(create_dto().validate().is_ok());
    }

    #[test]
    fn test_inverted_budget_is_rejected() {
        let mut dto = create_dto();
        dto.budget_min = Some(Decimal::from(600_000));
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_half_location_is_rejected() {
        let mut dto = create_dto();
        dto.longitude = None;
        assert!(dto.validate().is_err());

        let mut dto = create_dto();
        dto.latitude = Some(120.0);
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_budget_edit_is_checked_against_stored_bound() {
        let mut draft = test_order(Uuid::new_v4(), OrderStatus::Draft);
        draft.budget_min = None;
        draft.budget_max = Some(Decimal::from(100));

        let dto = UpdateOrderDto {
            budget_min: Some(Decimal::from(200)),
            ..Default::default()
        };
        assert!(dto.validate().is_ok());
        assert!(matches!(
            dto.merged_budget(&draft),
            Err(AppError::Validation(_))
        ));

        let dto = UpdateOrderDto {
            budget_min: Some(Decimal::from(50)),
            ..Default::default()
        };
        assert_eq!(
            dto.merged_budget(&draft).unwrap(),
            (Some(Decimal::from(50)), Some(Decimal::from(100)))
        );
    }

    #[test]
    fn test_draft_may_omit_price_and_address() {
        let dto: CreateOrderDto = serde_json::from_value(serde_json::json!({
            "category_id": Uuid::new_v4(),
            "title": "Move a sofa"
        }))
        .unwrap();
        assert!(dto.validate().is_ok());
        assert_eq!(dto.urgency, Urgency::Normal);
        assert!(dto.price_type.is_none());
    }
}
