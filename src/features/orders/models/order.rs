use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::shared::geo::{Coordinates, Locatable};

/// Order status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Open,
    InProgress,
    WaitingConfirmation,
    Completed,
    Cancelled,
    Disputed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Draft => write!(f, "draft"),
            OrderStatus::Open => write!(f, "open"),
            OrderStatus::InProgress => write!(f, "in_progress"),
            OrderStatus::WaitingConfirmation => write!(f, "waiting_confirmation"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
            OrderStatus::Disputed => write!(f, "disputed"),
        }
    }
}

/// How the customer intends to pay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "price_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PriceType {
    Fixed,
    Hourly,
    Negotiable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "order_urgency", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Database model for order
#[derive(Debug, Clone, FromRow)]
pub struct Order {
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
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: OrderStatus,
    pub is_published: bool,
    pub applications_count: i32,
    pub views_count: i32,
    pub preferred_start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub actual_start_date: Option<DateTime<Utc>>,
    pub actual_end_date: Option<DateTime<Utc>>,
    /// Rating the customer gave the executor
    pub customer_rating: Option<i16>,
    pub customer_review: Option<String>,
    /// Rating the executor gave the customer
    pub executor_rating: Option<i16>,
    pub executor_review: Option<String>,
    pub cancellation_reason: Option<String>,
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Open and published: the only state in which executors can bid
    pub fn accepts_applications(&self) -> bool {
        self.status == OrderStatus::Open && self.is_published
    }

    pub fn is_customer(&self, user_id: Uuid) -> bool {
        self.customer_id == user_id
    }

    pub fn is_assigned_executor(&self, user_id: Uuid) -> bool {
        self.executor_id == Some(user_id)
    }

    /// Both sides have left a rating
    pub fn is_fully_rated(&self) -> bool {
        self.customer_rating.is_some() && self.executor_rating.is_some()
    }
}

impl Locatable for Order {
    fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

/// Data for creating a new draft order
#[derive(Debug)]
pub struct CreateOrder {
    pub customer_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub price_type: Option<PriceType>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub urgency: Urgency,
    pub address: Option<String>,
    pub location: Option<Coordinates>,
    pub preferred_start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub attachments: Vec<String>,
}

#[cfg(test)]
pub(crate) fn test_order(customer_id: Uuid, status: OrderStatus) -> Order {
    use fake::faker::lorem::en::{Paragraph, Sentence};
    use fake::Fake;

    let now = Utc::now();
    Order {
        id: Uuid::new_v4(),
        customer_id,
        category_id: Uuid::new_v4(),
        executor_id: None,
        title: Sentence(3..6).fake(),
        description: Paragraph(1..3).fake(),
        price_type: Some(PriceType::Fixed),
        budget_min: Some(Decimal::from(200_000)),
        budget_max: Some(Decimal::from(400_000)),
        urgency: Urgency::Normal,
        address: Some("Chilonzor 9, Tashkent".to_string()),
        latitude: Some(41.30),
        longitude: Some(69.24),
        status,
        is_published: status != OrderStatus::Draft,
        applications_count: 0,
        views_count: 0,
        preferred_start_date: None,
        deadline: None,
        actual_start_date: None,
        actual_end_date: None,
        customer_rating: None,
        customer_review: None,
        executor_rating: None,
        executor_review: None,
        cancellation_reason: None,
        attachments: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}
