use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// Application status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationStatus::Pending => write!(f, "pending"),
            ApplicationStatus::Accepted => write!(f, "accepted"),
            ApplicationStatus::Rejected => write!(f, "rejected"),
            ApplicationStatus::Withdrawn => write!(f, "withdrawn"),
        }
    }
}

/// Database model for an executor's bid on an order
#[derive(Debug, Clone, FromRow)]
pub struct OrderApplication {
    pub id: Uuid,
    pub order_id: Uuid,
    pub executor_id: Uuid,
    /// None means the executor accepts the posted budget
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

impl OrderApplication {
    pub fn is_pending(&self) -> bool {
        self.status == ApplicationStatus::Pending
    }
}
