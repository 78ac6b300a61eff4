use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::features::applications::models::{ApplicationStatus, OrderApplication};
use crate::features::applications::workflow::Bid;
use crate::shared::types::{default_page, default_page_size, PaginationQuery};

/// Response DTO for an application
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationResponseDto {
    pub id: Uuid,
    pub order_id: Uuid,
    pub executor_id: Uuid,
    pub proposed_price: Option<Decimal>,
    pub proposed_duration_hours: Option<i32>,
    pub message: Option<String>,
    pub available_from: Option<DateTime<Utc>>,
    pub status: ApplicationStatus,
    pub is_viewed: bool,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderApplication> for ApplicationResponseDto {
    fn from(a: OrderApplication) -> Self {
        Self {
            id: a.id,
            order_id: a.order_id,
            executor_id: a.executor_id,
            proposed_price: a.proposed_price,
            proposed_duration_hours: a.proposed_duration_hours,
            message: a.message,
            available_from: a.available_from,
            status: a.status,
            is_viewed: a.is_viewed,
            rejection_reason: a.rejection_reason,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() || price.is_zero() {
        return Err(ValidationError::new("proposed_price")
            .with_message("Proposed price must be positive".into()));
    }
    Ok(())
}

/// Request DTO for bidding on an order
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct SubmitApplicationDto {
    /// Omit to accept the posted budget
    #[validate(custom(function = "validate_price"))]
    pub proposed_price: Option<Decimal>,
    #[validate(range(min = 1, max = 8760, message = "Duration must be between 1 and 8760 hours"))]
    pub proposed_duration_hours: Option<i32>,
    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    pub message: Option<String>,
    pub available_from: Option<DateTime<Utc>>,
}

impl From<SubmitApplicationDto> for Bid {
    fn from(dto: SubmitApplicationDto) -> Self {
        Self {
            proposed_price: dto.proposed_price,
            proposed_duration_hours: dto.proposed_duration_hours,
            message: dto.message,
            available_from: dto.available_from,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct RejectApplicationDto {
    #[validate(length(max = 1000, message = "Reason must be at most 1000 characters"))]
    pub reason: Option<String>,
}

/// Query params for listing applications
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ApplicationListQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    /// Items per page
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
    /// Filter by status
    pub status: Option<ApplicationStatus>,
}

impl ApplicationListQuery {
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

    #[test]
    fn test_bid_without_price_accepts_budget() {
        let dto: SubmitApplicationDto = serde_json::from_value(serde_json::json!({
            "message": "Can start tomorrow"
        }))
        .unwrap();
        assert!(dto.validate().is_ok());

        let bid = Bid::from(dto);
        assert!(bid.proposed_price.is_none());
        assert_eq!(bid.message.as_deref(), Some("Can start tomorrow"));
    }

    #[test]
    fn test_non_positive_price_is_rejected() {
        let dto = SubmitApplicationDto {
            proposed_price: Some(Decimal::ZERO),
            ..Default::default()
        };
        assert!(dto.validate().is_err());

        let dto = SubmitApplicationDto {
            proposed_price: Some(Decimal::from(350_000)),
            proposed_duration_hours: Some(0),
            ..Default::default()
        };
        assert!(dto.validate().is_err());
    }
}
