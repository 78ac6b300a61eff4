use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::shared::types::{default_page, default_page_size, PaginationQuery};

/// Query params for browsing orders that accept applications
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct OpenOrdersQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    /// Items per page
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
    /// Restrict to this category and its subcategories
    pub category_id: Option<Uuid>,
}

impl OpenOrdersQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            page_size: self.page_size,
        }
    }
}
